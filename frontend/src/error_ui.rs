use crate::dataflow::{Actor, Relay, relay};
use crate::error_display::{ErrorAlert, ErrorDisplay, NotificationVariant};
use crate::theme::*;
use futures::{select, stream::StreamExt};
use zoon::events::Click;
use zoon::*;

/// Progress percentage for toast auto-dismiss timer (0.0 to 100.0)
type Progress = f32;

/// Toast notifications container, pinned to the top right corner
pub fn toast_notifications_container(error_display: ErrorDisplay) -> impl Element {
    El::new()
        .s(Width::fill())
        .s(Height::fill())
        .s(Align::new().top().right())
        .s(Padding::all(SPACING_16))
        .update_raw_el(|raw_el| {
            raw_el
                .style("position", "fixed")
                .style("top", "0")
                .style("left", "0")
                .style("pointer-events", "none")
                .style("z-index", "30000")
        })
        .child(
            Column::new()
                .s(Gap::new().y(SPACING_8))
                .s(Width::exact(400))
                .s(Align::new().top().right())
                .update_raw_el(|raw_el| raw_el.style("pointer-events", "auto"))
                .items_signal_vec(
                    error_display.active_toasts.signal_vec().map({
                        let dismissed_relay = error_display.toast_dismissed_relay.clone();
                        move |alert| toast_element(alert, dismissed_relay.clone())
                    }),
                ),
        )
}

fn variant_colors(variant: NotificationVariant) -> (HSLuv, HSLuv) {
    match variant {
        NotificationVariant::Error => (error_background(), error()),
        NotificationVariant::Info => (info_background(), info()),
        NotificationVariant::Success => (success_background(), success()),
    }
}

/// Click pauses the countdown, the cross dismisses immediately.
fn toast_element(alert: ErrorAlert, toast_dismissed_relay: Relay<String>) -> impl Element {
    let (toast_clicked_relay, mut toast_clicked_stream) = relay();
    let (dismiss_button_clicked_relay, mut dismiss_button_clicked_stream) = relay();
    let auto_dismiss_ms = alert.auto_dismiss_ms as f32;
    let (background_color, accent_color) = variant_colors(alert.variant);

    let toast_actor = Actor::new(100.0 as Progress, {
        let id = alert.id.clone();
        async move |state| {
            let mut elapsed_time = 0.0f32;
            let mut is_paused = false;
            let update_interval_ms = 50.0f32;

            loop {
                select! {
                    _ = Timer::sleep(update_interval_ms as u32).fuse() => {
                        if auto_dismiss_ms > 0.0 && !is_paused {
                            elapsed_time += update_interval_ms;
                            let remaining_percent = 100.0 - (elapsed_time / auto_dismiss_ms * 100.0);
                            state.set(remaining_percent.max(0.0));

                            if elapsed_time >= auto_dismiss_ms {
                                toast_dismissed_relay.send(id.clone());
                                break;
                            }
                        }
                    }
                    event = toast_clicked_stream.next() => {
                        if let Some(()) = event {
                            is_paused = !is_paused;
                        }
                    }
                    event = dismiss_button_clicked_stream.next() => {
                        if let Some(()) = event {
                            toast_dismissed_relay.send(id.clone());
                            break;
                        }
                    }
                }
            }
        }
    });

    Column::new()
        .s(Width::fill())
        .s(Background::new().color(background_color))
        .s(Borders::all(Border::new().width(1).color(accent_color)))
        .s(RoundedCorners::all(CORNER_RADIUS_8))
        .s(Shadows::new(vec![Shadow::new().color(hsluv!(0, 0, 0, 10)).x(0).y(2).blur(8)]))
        .s(Cursor::new(CursorIcon::Pointer))
        .update_raw_el(|raw_el| raw_el.attr("title", "Click to pause/resume auto-dismiss"))
        .on_click(move || toast_clicked_relay.send(()))
        .item(
            Row::new()
                .s(Width::fill())
                .s(Padding::all(SPACING_12))
                .s(Gap::new().x(SPACING_8))
                .s(Align::new().center_y())
                .item(
                    Column::new()
                        .s(Width::fill())
                        .s(Gap::new().y(SPACING_4))
                        .item(
                            El::new()
                                .s(Font::new().size(FONT_SIZE_16).weight(FontWeight::SemiBold).color(accent_color))
                                .child(&alert.title),
                        )
                        .item(
                            El::new()
                                .s(Font::new().size(FONT_SIZE_14).color(text()).wrap_anywhere())
                                .child(&alert.message),
                        ),
                )
                .item(
                    El::new()
                        .s(Font::new().size(FONT_SIZE_14).color(text_muted()))
                        .s(Cursor::new(CursorIcon::Pointer))
                        .s(Padding::all(SPACING_4))
                        .s(RoundedCorners::all(CORNER_RADIUS_4))
                        .child("✕")
                        .update_raw_el(move |raw_el| {
                            raw_el.event_handler(move |event: Click| {
                                event.stop_propagation();
                                dismiss_button_clicked_relay.send(());
                            })
                        }),
                ),
        )
        .item((alert.auto_dismiss_ms > 0).then(|| {
            El::new()
                .s(Width::fill())
                .s(Height::exact(3))
                .s(Background::new().color(panel()))
                .child(
                    El::new()
                        .s(Height::fill())
                        .s(Width::percent_signal(toast_actor.signal()))
                        .s(Background::new().color(accent_color))
                        .s(Transitions::new([Transition::property("width").duration(150)])),
                )
        }))
        .after_remove(move |_| drop(toast_actor))
}
