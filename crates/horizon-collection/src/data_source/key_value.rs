//! A leaf showing fields of one object as title/value rows.

use std::fmt;
use std::sync::Arc;

use super::{DataSourceContent, DataSourceId, DataSourceTree, Item};
use crate::change::Notifier;
use crate::index_path::IndexPath;
use horizon_collection_core::Result;

type ValueFn<O> = Arc<dyn Fn(&O) -> Option<String> + Send + Sync>;

/// How the host should present a row's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValueKind {
    Text,
    /// A button sending `action` when tapped.
    Button { action: String },
    /// A link the host opens when tapped.
    Url,
}

/// One potential row: a title plus a closure reading the value from the
/// source object. Rows whose closure returns `None` are not shown.
pub struct KeyValueItem<O> {
    title: String,
    kind: KeyValueKind,
    value: ValueFn<O>,
}

impl<O> Clone for KeyValueItem<O> {
    fn clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            kind: self.kind.clone(),
            value: self.value.clone(),
        }
    }
}

impl<O> fmt::Debug for KeyValueItem<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValueItem")
            .field("title", &self.title)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<O> KeyValueItem<O> {
    pub fn text<F>(title: impl Into<String>, value: F) -> Self
    where
        F: Fn(&O) -> Option<String> + Send + Sync + 'static,
    {
        Self::with_kind(title, KeyValueKind::Text, value)
    }

    pub fn button<F>(title: impl Into<String>, action: impl Into<String>, value: F) -> Self
    where
        F: Fn(&O) -> Option<String> + Send + Sync + 'static,
    {
        Self::with_kind(title, KeyValueKind::Button { action: action.into() }, value)
    }

    pub fn url<F>(title: impl Into<String>, value: F) -> Self
    where
        F: Fn(&O) -> Option<String> + Send + Sync + 'static,
    {
        Self::with_kind(title, KeyValueKind::Url, value)
    }

    fn with_kind<F>(title: impl Into<String>, kind: KeyValueKind, value: F) -> Self
    where
        F: Fn(&O) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            title: title.into(),
            kind,
            value: Arc::new(value),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> &KeyValueKind {
        &self.kind
    }

    pub fn value_for(&self, object: &O) -> Option<String> {
        (self.value)(object)
    }
}

/// A row as published to the host: the item's title and its evaluated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueRow {
    pub title: String,
    pub value: String,
    pub kind: KeyValueKind,
}

/// A single-section leaf whose rows are evaluated against a source object.
///
/// The source is not observed: rows are re-evaluated when the object or
/// the item list is replaced, or on [`refresh`](Self::refresh).
pub struct KeyValueDataSource<O> {
    object: Option<O>,
    items: Vec<KeyValueItem<O>>,
    rows: Vec<Arc<KeyValueRow>>,
    title_column_width: f32,
}

impl<O> fmt::Debug for KeyValueDataSource<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValueDataSource")
            .field("has_object", &self.object.is_some())
            .field("items", &self.items.len())
            .field("rows", &self.rows.len())
            .finish()
    }
}

impl<O: Send + 'static> KeyValueDataSource<O> {
    pub fn new(object: Option<O>, items: Vec<KeyValueItem<O>>) -> Self {
        let mut source = Self {
            object,
            items,
            rows: Vec::new(),
            title_column_width: 0.0,
        };
        source.evaluate();
        source
    }

    pub fn object(&self) -> Option<&O> {
        self.object.as_ref()
    }

    /// Replace the source object and reload every row.
    pub fn set_object(&mut self, object: Option<O>, notifier: &mut Notifier) {
        self.object = object;
        self.evaluate();
        notifier.notify_did_reload_data();
    }

    /// Replace the potential rows and reload.
    pub fn set_items(&mut self, items: Vec<KeyValueItem<O>>, notifier: &mut Notifier) {
        self.items = items;
        self.evaluate();
        notifier.notify_did_reload_data();
    }

    /// Re-read every value from the current object.
    pub fn refresh(&mut self, notifier: &mut Notifier) {
        self.evaluate();
        notifier.notify_did_reload_data();
    }

    pub fn rows(&self) -> &[Arc<KeyValueRow>] {
        &self.rows
    }

    /// Width the host should give the title column so titles line up
    /// across cells.
    pub fn title_column_width(&self) -> f32 {
        self.title_column_width
    }

    pub fn set_title_column_width(&mut self, width: f32) {
        self.title_column_width = width.max(0.0);
    }

    fn evaluate(&mut self) {
        let Some(object) = self.object.as_ref() else {
            self.rows.clear();
            return;
        };
        self.rows = self
            .items
            .iter()
            .filter_map(|item| {
                item.value_for(object).map(|value| {
                    Arc::new(KeyValueRow {
                        title: item.title.clone(),
                        value,
                        kind: item.kind.clone(),
                    })
                })
            })
            .collect();
    }
}

impl<O: Send + 'static> DataSourceContent for KeyValueDataSource<O> {
    fn number_of_items(&self, section: usize) -> usize {
        if section == 0 { self.rows.len() } else { 0 }
    }

    fn item(&self, path: IndexPath) -> Option<Item> {
        if path.section_index() != Some(0) {
            return None;
        }
        self.rows.get(path.item).map(|row| row.clone() as Item)
    }

    fn can_edit_item(&self, _path: IndexPath) -> bool {
        false
    }

    fn reset_content(&mut self) {
        self.object = None;
        self.rows.clear();
    }
}

impl DataSourceTree {
    /// Replace the source object of a [`KeyValueDataSource`] leaf.
    pub fn set_key_value_object<O: Send + 'static>(&mut self, id: DataSourceId, object: Option<O>) -> Result<()> {
        self.update_leaf(id, |content: &mut KeyValueDataSource<O>, notifier| {
            content.set_object(object, notifier)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeEvent;

    #[derive(Debug, Clone)]
    struct Contact {
        name: String,
        email: Option<String>,
        homepage: Option<String>,
    }

    fn contact(email: Option<&str>) -> Contact {
        Contact {
            name: "Ada".to_string(),
            email: email.map(str::to_string),
            homepage: Some("https://example.org".to_string()),
        }
    }

    fn items() -> Vec<KeyValueItem<Contact>> {
        vec![
            KeyValueItem::text("Name", |c: &Contact| Some(c.name.clone())),
            KeyValueItem::text("Email", |c: &Contact| c.email.clone()),
            KeyValueItem::url("Homepage", |c: &Contact| c.homepage.clone()),
        ]
    }

    fn titles(source: &KeyValueDataSource<Contact>) -> Vec<&str> {
        source.rows().iter().map(|row| row.title.as_str()).collect()
    }

    #[test]
    fn test_rows_without_value_are_hidden() {
        let source = KeyValueDataSource::new(Some(contact(None)), items());
        assert_eq!(titles(&source), vec!["Name", "Homepage"]);
        assert_eq!(source.number_of_items(0), 2);
        let row = source.item(IndexPath::new(0, 1)).unwrap();
        let row = row.downcast_ref::<KeyValueRow>().unwrap();
        assert_eq!(row.value, "https://example.org");
        assert_eq!(row.kind, KeyValueKind::Url);
    }

    #[test]
    fn test_no_object_shows_nothing() {
        let source = KeyValueDataSource::<Contact>::new(None, items());
        assert!(source.rows().is_empty());
        assert!(source.item(IndexPath::new(0, 0)).is_none());
    }

    #[test]
    fn test_set_object_reevaluates_and_reloads() {
        let mut source = KeyValueDataSource::new(Some(contact(None)), items());
        let mut notifier = Notifier::new();
        source.set_object(Some(contact(Some("ada@example.org"))), &mut notifier);
        assert_eq!(titles(&source), vec!["Name", "Email", "Homepage"]);
        assert_eq!(notifier.events(), &[ChangeEvent::ReloadData]);

        source.set_object(None, &mut notifier);
        assert!(source.rows().is_empty());
    }

    #[test]
    fn test_button_row_carries_action() {
        let items = vec![KeyValueItem::button("Call", "call", |c: &Contact| Some(c.name.clone()))];
        let source = KeyValueDataSource::new(Some(contact(None)), items);
        assert_eq!(
            source.rows()[0].kind,
            KeyValueKind::Button {
                action: "call".to_string()
            }
        );
    }

    #[test]
    fn test_tree_object_replacement() {
        let mut tree = DataSourceTree::default();
        let leaf = tree.add_leaf(KeyValueDataSource::new(Some(contact(None)), items()));
        tree.set_root(leaf).unwrap();
        assert_eq!(tree.content_items_in_section(0), 2);

        tree.set_key_value_object(leaf, Some(contact(Some("ada@example.org")))).unwrap();
        assert_eq!(tree.content_items_in_section(0), 3);

        // The wrong object type is refused.
        assert!(tree.set_key_value_object(leaf, Some(42_u32)).is_err());
    }
}
