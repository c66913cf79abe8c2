//! Dark palette shared by all views.

use zoon::*;

pub const SPACING_4: u32 = 4;
pub const SPACING_8: u32 = 8;
pub const SPACING_12: u32 = 12;
pub const SPACING_16: u32 = 16;

pub const FONT_SIZE_12: u32 = 12;
pub const FONT_SIZE_14: u32 = 14;
pub const FONT_SIZE_16: u32 = 16;

pub const CORNER_RADIUS_4: u32 = 4;
pub const CORNER_RADIUS_8: u32 = 8;

pub fn background() -> HSLuv {
    hsluv!(220, 15, 8)
}

pub fn panel() -> HSLuv {
    hsluv!(220, 15, 11)
}

pub fn panel_header() -> HSLuv {
    hsluv!(220, 15, 13)
}

pub fn border() -> HSLuv {
    hsluv!(220, 10, 25)
}

pub fn row_hover() -> HSLuv {
    hsluv!(220, 15, 16)
}

pub fn row_checked() -> HSLuv {
    hsluv!(230, 40, 22)
}

pub fn text() -> HSLuv {
    hsluv!(220, 10, 85)
}

pub fn text_muted() -> HSLuv {
    hsluv!(220, 10, 60)
}

pub fn primary() -> HSLuv {
    hsluv!(230, 75, 55)
}

pub fn primary_hover() -> HSLuv {
    hsluv!(230, 75, 62)
}

pub fn error() -> HSLuv {
    hsluv!(12, 80, 55)
}

pub fn error_background() -> HSLuv {
    hsluv!(12, 40, 15)
}

pub fn info() -> HSLuv {
    hsluv!(240, 70, 60)
}

pub fn info_background() -> HSLuv {
    hsluv!(240, 35, 15)
}

pub fn success() -> HSLuv {
    hsluv!(130, 70, 60)
}

pub fn success_background() -> HSLuv {
    hsluv!(130, 35, 14)
}

pub fn overlay() -> &'static str {
    "rgba(0, 0, 0, 0.7)"
}

/// Small flat button used across the toolbar and dialogs.
pub fn button(label: impl Into<String>, on_press: impl FnMut() + 'static) -> impl Element {
    let hovered = Mutable::new(false);
    Button::new()
        .s(Padding::new().x(SPACING_12).y(6))
        .s(RoundedCorners::all(CORNER_RADIUS_4))
        .s(Font::new().size(FONT_SIZE_14).color(text()))
        .s(Borders::all(Border::new().width(1).color(border())))
        .s(Background::new().color_signal(
            hovered.signal().map_bool(row_hover, panel),
        ))
        .on_hovered_change(move |is_hovered| hovered.set_neq(is_hovered))
        .label(label.into())
        .on_press(on_press)
}

/// Same as [`button`], greyed out and inert while `disabled` is true.
pub fn button_disabled_signal(
    label: impl Into<String>,
    disabled: impl Signal<Item = bool> + Unpin + 'static,
    on_press: impl FnMut() + 'static,
) -> impl Element {
    let disabled = Broadcaster::new(disabled);
    let hovered = Mutable::new(false);
    Button::new()
        .s(Padding::new().x(SPACING_12).y(6))
        .s(RoundedCorners::all(CORNER_RADIUS_4))
        .s(Font::new().size(FONT_SIZE_14).color_signal(
            disabled.signal().map_bool(text_muted, text),
        ))
        .s(Borders::all(Border::new().width(1).color(border())))
        .s(Background::new().color_signal(map_ref! {
            let disabled = disabled.signal(),
            let hovered = hovered.signal() => {
                if *hovered && !*disabled { row_hover() } else { panel() }
            }
        }))
        .s(Cursor::with_signal(disabled.signal().map_bool(
            || CursorIcon::NotAllowed,
            || CursorIcon::Pointer,
        )))
        .on_hovered_change(move |is_hovered| hovered.set_neq(is_hovered))
        .label(label.into())
        .on_press(on_press)
}

pub fn muted_text(content: impl IntoCowStr<'static>) -> impl Element {
    El::new()
        .s(Font::new().size(FONT_SIZE_12).color(text_muted()))
        .child(Text::new(content))
}
