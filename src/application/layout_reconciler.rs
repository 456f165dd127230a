// Layout reconciler - folds a layout-surface snapshot back into the widget collection
use crate::domain::widget::{LayoutItem, Widget};
use std::collections::HashMap;

/// Returns a new collection, in the same order as `widgets`, where each
/// widget's layout is taken from the snapshot entry with its id.
///
/// - Widgets missing from the snapshot keep their previous layout.
/// - Snapshot entries for unknown ids are dropped.
/// - Only `layout` is ever touched.
pub fn reconcile(widgets: &[Widget], snapshot: &[LayoutItem]) -> Vec<Widget> {
    let positions: HashMap<&str, &LayoutItem> =
        snapshot.iter().map(|item| (item.id.as_str(), item)).collect();

    let stale = snapshot.len().saturating_sub(
        widgets
            .iter()
            .filter(|w| positions.contains_key(w.id.as_str()))
            .count(),
    );
    if stale > 0 {
        tracing::debug!("Ignoring {} layout entries with no matching widget", stale);
    }

    widgets
        .iter()
        .map(|widget| match positions.get(widget.id.as_str()) {
            Some(item) => Widget {
                layout: item.layout(),
                ..widget.clone()
            },
            None => widget.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::widget::{Layout, WidgetKind};

    fn item(id: &str, x: u32, y: u32, w: u32, h: u32) -> LayoutItem {
        LayoutItem {
            id: id.to_string(),
            x,
            y,
            w,
            h,
        }
    }

    fn three_widgets() -> Vec<Widget> {
        ["a", "b", "c"]
            .into_iter()
            .enumerate()
            .map(|(i, id)| {
                let mut w = Widget::new_default(WidgetKind::Chart)
                    .with_layout(Layout::new(i as u32 * 4, 0, 4, 6));
                w.id = id.to_string();
                w.title = format!("widget {id}");
                w
            })
            .collect()
    }

    #[test]
    fn test_preserves_non_layout_fields() {
        let widgets = three_widgets();
        let reconciled = reconcile(&widgets, &[item("a", 8, 6, 3, 4)]);

        assert_eq!(reconciled[0].layout, Layout::new(8, 6, 3, 4));
        assert_eq!(reconciled[0].title, widgets[0].title);
        assert_eq!(reconciled[0].source, widgets[0].source);
        assert_eq!(reconciled[0].kind, widgets[0].kind);
        assert_eq!(reconciled[0].refresh_sec, widgets[0].refresh_sec);
    }

    #[test]
    fn test_total_over_known_ids() {
        let widgets = three_widgets();
        let reconciled = reconcile(&widgets, &[item("a", 0, 1, 4, 6), item("c", 0, 2, 4, 6)]);

        let ids: Vec<&str> = reconciled.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(reconciled[1].layout, widgets[1].layout);
        assert_eq!(reconciled[2].layout, Layout::new(0, 2, 4, 6));
    }

    #[test]
    fn test_drops_unknown_entries() {
        let widgets = three_widgets();
        let reconciled = reconcile(&widgets, &[item("ghost", 1, 1, 1, 1)]);

        assert_eq!(reconciled, widgets);
    }

    #[test]
    fn test_order_follows_collection_not_snapshot() {
        let widgets = three_widgets();
        let reconciled = reconcile(
            &widgets,
            &[item("c", 0, 0, 4, 6), item("b", 4, 0, 4, 6), item("a", 8, 0, 4, 6)],
        );

        let ids: Vec<&str> = reconciled.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_input_untouched() {
        let widgets = three_widgets();
        let before = widgets.clone();
        let _ = reconcile(&widgets, &[item("b", 9, 9, 3, 3)]);

        assert_eq!(widgets, before);
    }
}
