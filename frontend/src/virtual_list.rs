//! Virtualized column list.
//!
//! A stable pool of row elements is positioned with transforms inside a Stack as
//! tall as the whole list. [`PoolSink`] is the [`RowSink`] the column domain
//! renders into; slots are reused and only grow when the window needs more rows.

use crate::columns::ColumnsDomain;
use crate::theme::*;
use shared::viewport::{RenderedRow, RowSink};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use zoon::*;

/// One reusable row element.
#[derive(Clone, Debug, Default)]
pub struct PoolSlot {
    pub name: Mutable<String>,
    pub time: Mutable<Option<String>>,
    pub checked: Mutable<bool>,
    pub position: Mutable<usize>,
    pub offset: Mutable<f64>,
    pub visible: Mutable<bool>,
}

pub struct PoolSink {
    pool: MutableVec<PoolSlot>,
    used: usize,
}

impl PoolSink {
    pub fn new(pool: MutableVec<PoolSlot>) -> Self {
        Self { pool, used: 0 }
    }

    pub fn used(&self) -> usize {
        self.used
    }
}

impl RowSink for PoolSink {
    fn clear(&mut self) {
        self.used = 0;
        for slot in self.pool.lock_ref().iter() {
            slot.visible.set_neq(false);
        }
    }

    fn row(&mut self, row: RenderedRow<'_>) {
        let slot = {
            let mut pool = self.pool.lock_mut();
            if self.used == pool.len() {
                pool.push_cloned(PoolSlot::default());
            }
            pool[self.used].clone()
        };
        slot.name.set_neq(row.name.to_string());
        slot.time.set_neq(row.time.map(str::to_string));
        slot.checked.set_neq(row.checked);
        slot.position.set_neq(row.position);
        slot.offset.set_neq(row.offset);
        slot.visible.set_neq(true);
        self.used += 1;
    }

    fn set_checked(&mut self, position: usize, checked: bool) {
        for slot in self.pool.lock_ref().iter().take(self.used) {
            if slot.position.get() == position {
                slot.checked.set_neq(checked);
            }
        }
    }
}

pub fn columns_virtual_list(columns: ColumnsDomain) -> impl Element {
    El::new()
        .s(Width::fill())
        .s(Height::fill())
        .on_viewport_size_change({
            let viewport_measured_relay = columns.viewport_measured_relay.clone();
            move |_width, height| viewport_measured_relay.send(height as f64)
        })
        .child(scroll_container(columns))
}

fn scroll_container(columns: ColumnsDomain) -> impl Element {
    let item_height = columns.snapshot.signal_ref(|snapshot| snapshot.item_height as u32).broadcast();
    let content_height = columns.snapshot.signal_ref(|snapshot| snapshot.content_height.ceil() as u32);
    let scroll_generation = columns.snapshot.signal_ref(|snapshot| snapshot.scroll_generation);

    El::new()
        .s(Width::fill())
        .s(Height::fill())
        .s(Background::new().color(panel()))
        .update_raw_el({
            let list_scrolled_relay = columns.list_scrolled_relay.clone();
            move |raw_el| {
                if let Some(html_el) = raw_el.dom_element().dyn_ref::<web_sys::HtmlElement>() {
                    let scroll_el = html_el.clone();
                    let scroll_closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
                        list_scrolled_relay.send(scroll_el.scroll_top() as f64);
                    }) as Box<dyn FnMut(web_sys::Event)>);
                    if let Err(error) = html_el
                        .add_event_listener_with_callback("scroll", scroll_closure.as_ref().unchecked_ref())
                    {
                        zoon::eprintln!("Scroll listener not attached: {:?}", error);
                    }
                    scroll_closure.forget();
                }
                raw_el
                    .style("overflow-y", "auto")
                    .style("display", "block")
                    .style("scrollbar-width", "thin")
            }
        })
        .after_insert(move |html_el: web_sys::HtmlElement| {
            // New data or filter: the window restarts at the top, so must the scrollbar.
            Task::start(scroll_generation.for_each_sync(move |_| html_el.set_scroll_top(0)));
        })
        .child(
            Stack::new()
                .s(Width::fill())
                .s(Height::exact_signal(content_height))
                .layers_signal_vec(columns.pool.signal_vec_cloned().map({
                    let columns = columns.clone();
                    move |slot| pool_row(slot, columns.clone(), item_height.signal())
                })),
        )
}

fn pool_row(
    slot: PoolSlot,
    columns: ColumnsDomain,
    item_height: impl Signal<Item = u32> + Unpin + 'static,
) -> impl Element {
    let hovered = Mutable::new(false);
    Row::new()
        .s(Width::fill())
        .s(Height::exact_signal(item_height))
        .s(Padding::new().x(SPACING_12))
        .s(Gap::new().x(SPACING_12))
        .s(Align::new().top())
        .s(Transform::with_signal_self(map_ref! {
            let offset = slot.offset.signal(),
            let visible = slot.visible.signal() => {
                if *visible {
                    Transform::new().move_down(*offset)
                } else {
                    Transform::new().move_down(-9999)
                }
            }
        }))
        .s(Borders::new().bottom(Border::new().width(1).color(border())))
        .s(Background::new().color_signal(map_ref! {
            let checked = slot.checked.signal(),
            let hovered = hovered.signal() => {
                if *checked {
                    row_checked()
                } else if *hovered {
                    row_hover()
                } else {
                    panel()
                }
            }
        }))
        .s(Cursor::new(CursorIcon::Pointer))
        .on_hovered_change(move |is_hovered| hovered.set_neq(is_hovered))
        .on_click({
            let name = slot.name.clone();
            move || columns.row_toggled_relay.send(name.get_cloned())
        })
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_16).color(text()))
                .child_signal(slot.checked.signal().map_bool(|| "☑", || "☐")),
        )
        .item(
            El::new()
                .s(Width::fill())
                .s(Font::new().size(FONT_SIZE_14).color(text()).no_wrap())
                .update_raw_el(|raw_el| raw_el.style("overflow", "hidden").style("text-overflow", "ellipsis"))
                .child_signal(slot.name.signal_cloned()),
        )
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_12).color(text_muted()).no_wrap())
                .child_signal(slot.time.signal_cloned().map(|time| time.unwrap_or_default())),
        )
}
