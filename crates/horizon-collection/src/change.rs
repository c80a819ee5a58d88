//! Change notifications and update batches.
//!
//! Leaves describe what changed with a [`Notifier`] in their *local* section
//! space. The tree translates every event through the composed parents'
//! mappings into the root's *global* space and buffers it until the
//! outermost update closes, then hands the host view one [`ChangeBatch`].
//!
//! Events in a batch are ordered: each one is expressed in the coordinate
//! space produced by the events before it.
//!
//! Load progress never enters a batch. Observers that need to hear when a
//! data source starts loading, or finishes with an error, connect to
//! [`DataSourceTree::load_state_changed`](crate::DataSourceTree::load_state_changed):
//! a [`LoadStateChange`](crate::LoadStateChange) into `Loading` or
//! `Refreshing` announces a load, and one into `Error` is followed by the
//! error in [`DataSourceTree::loading_error`](crate::DataSourceTree::loading_error).

use std::collections::BTreeSet;

use crate::index_path::IndexPath;
use crate::metrics::ElementKind;
use crate::view::BatchUpdates;

/// Slide hint for section insertions and removals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionDirection {
    #[default]
    None,
    Left,
    Right,
}

impl SectionDirection {
    /// Direction for moving from segment `old` to segment `new`.
    pub fn between(old: usize, new: usize) -> Self {
        match new.cmp(&old) {
            std::cmp::Ordering::Greater => SectionDirection::Left,
            std::cmp::Ordering::Less => SectionDirection::Right,
            std::cmp::Ordering::Equal => SectionDirection::None,
        }
    }
}

/// A single change to sections or items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    ItemsInserted(Vec<IndexPath>),
    ItemsRemoved(Vec<IndexPath>),
    ItemsRefreshed(Vec<IndexPath>),
    ItemMoved {
        from: IndexPath,
        to: IndexPath,
    },
    SectionsInserted {
        sections: BTreeSet<usize>,
        direction: SectionDirection,
    },
    SectionsRemoved {
        sections: BTreeSet<usize>,
        direction: SectionDirection,
    },
    SectionMoved {
        from: usize,
        to: usize,
        direction: SectionDirection,
    },
    SectionsRefreshed(BTreeSet<usize>),
    /// Everything may have changed.
    ReloadData,
    /// The content of supplementary views changed; layout may need invalidation.
    SupplementaryUpdated {
        kind: ElementKind,
        paths: Vec<IndexPath>,
    },
}

impl ChangeEvent {
    /// Whether the event changes the number or order of sections.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ChangeEvent::SectionsInserted { .. }
                | ChangeEvent::SectionsRemoved { .. }
                | ChangeEvent::SectionMoved { .. }
                | ChangeEvent::ReloadData
        )
    }

    /// Whether the event is about individual items.
    pub fn is_item_level(&self) -> bool {
        matches!(
            self,
            ChangeEvent::ItemsInserted(_)
                | ChangeEvent::ItemsRemoved(_)
                | ChangeEvent::ItemsRefreshed(_)
                | ChangeEvent::ItemMoved { .. }
        )
    }

    /// Whether the event carries nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            ChangeEvent::ItemsInserted(paths)
            | ChangeEvent::ItemsRemoved(paths)
            | ChangeEvent::ItemsRefreshed(paths)
            | ChangeEvent::SupplementaryUpdated { paths, .. } => paths.is_empty(),
            ChangeEvent::SectionsInserted { sections, .. }
            | ChangeEvent::SectionsRemoved { sections, .. }
            | ChangeEvent::SectionsRefreshed(sections) => sections.is_empty(),
            _ => false,
        }
    }
}

/// Collects change notifications in the emitter's local space.
///
/// Handed to leaf content while it mutates its items; the tree drains it
/// afterwards and routes the events toward the root.
#[derive(Debug, Default)]
pub struct Notifier {
    events: Vec<ChangeEvent>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, event: ChangeEvent) {
        if !event.is_empty() {
            self.events.push(event);
        }
    }

    pub fn notify_items_inserted(&mut self, paths: impl IntoIterator<Item = IndexPath>) {
        self.push(ChangeEvent::ItemsInserted(paths.into_iter().collect()));
    }

    pub fn notify_items_removed(&mut self, paths: impl IntoIterator<Item = IndexPath>) {
        self.push(ChangeEvent::ItemsRemoved(paths.into_iter().collect()));
    }

    pub fn notify_items_refreshed(&mut self, paths: impl IntoIterator<Item = IndexPath>) {
        self.push(ChangeEvent::ItemsRefreshed(paths.into_iter().collect()));
    }

    pub fn notify_item_moved(&mut self, from: IndexPath, to: IndexPath) {
        self.push(ChangeEvent::ItemMoved { from, to });
    }

    pub fn notify_sections_inserted(
        &mut self,
        sections: impl IntoIterator<Item = usize>,
        direction: SectionDirection,
    ) {
        self.push(ChangeEvent::SectionsInserted {
            sections: sections.into_iter().collect(),
            direction,
        });
    }

    pub fn notify_sections_removed(
        &mut self,
        sections: impl IntoIterator<Item = usize>,
        direction: SectionDirection,
    ) {
        self.push(ChangeEvent::SectionsRemoved {
            sections: sections.into_iter().collect(),
            direction,
        });
    }

    pub fn notify_section_moved(&mut self, from: usize, to: usize, direction: SectionDirection) {
        self.push(ChangeEvent::SectionMoved {
            from,
            to,
            direction,
        });
    }

    pub fn notify_sections_refreshed(&mut self, sections: impl IntoIterator<Item = usize>) {
        self.push(ChangeEvent::SectionsRefreshed(sections.into_iter().collect()));
    }

    pub fn notify_did_reload_data(&mut self) {
        self.push(ChangeEvent::ReloadData);
    }

    /// A header's content changed. `paths` locate the header views
    /// (section, header index) in local space.
    pub fn notify_content_updated_for_header(&mut self, paths: impl IntoIterator<Item = IndexPath>) {
        self.push(ChangeEvent::SupplementaryUpdated {
            kind: ElementKind::Header,
            paths: paths.into_iter().collect(),
        });
    }

    pub fn notify_content_updated_for_footer(&mut self, paths: impl IntoIterator<Item = IndexPath>) {
        self.push(ChangeEvent::SupplementaryUpdated {
            kind: ElementKind::Footer,
            paths: paths.into_iter().collect(),
        });
    }

    /// Events recorded so far.
    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take the recorded events, leaving the notifier empty.
    pub fn take(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.events)
    }
}

/// The events of one outermost update, in global space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    events: Vec<ChangeEvent>,
}

impl ChangeBatch {
    pub fn new(events: Vec<ChangeEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether the batch asks for a full reload.
    pub fn requires_reload(&self) -> bool {
        self.events.iter().any(|event| matches!(event, ChangeEvent::ReloadData))
    }

    /// Supplementary content updates, which only affect layout.
    pub fn supplementary_updates(&self) -> impl Iterator<Item = (&ElementKind, &[IndexPath])> {
        self.events.iter().filter_map(|event| match event {
            ChangeEvent::SupplementaryUpdated { kind, paths } => Some((kind, paths.as_slice())),
            _ => None,
        })
    }

    /// Replay the batch through a host's per-operation entry points.
    pub fn apply_to<B: BatchUpdates + ?Sized>(&self, target: &mut B) {
        for event in &self.events {
            match event {
                ChangeEvent::ItemsInserted(paths) => target.insert_items(paths),
                ChangeEvent::ItemsRemoved(paths) => target.delete_items(paths),
                ChangeEvent::ItemsRefreshed(paths) => target.reload_items(paths),
                ChangeEvent::ItemMoved { from, to } => target.move_item(*from, *to),
                ChangeEvent::SectionsInserted {
                    sections,
                    direction,
                } => target.insert_sections(sections, *direction),
                ChangeEvent::SectionsRemoved {
                    sections,
                    direction,
                } => target.delete_sections(sections, *direction),
                ChangeEvent::SectionMoved {
                    from,
                    to,
                    direction,
                } => target.move_section(*from, *to, *direction),
                ChangeEvent::SectionsRefreshed(sections) => target.reload_sections(sections),
                ChangeEvent::ReloadData | ChangeEvent::SupplementaryUpdated { .. } => {}
            }
        }
    }

    /// Replay the batch against per-section item counts.
    ///
    /// `before` holds the counts the host saw before the batch. Sections that
    /// the batch inserts, refreshes or reloads are read from `after` once the
    /// whole batch has been replayed, the same way a host re-queries its data
    /// source; item events aimed at such sections are therefore skipped.
    pub fn replay_item_counts<F>(&self, before: &[usize], after: F) -> Vec<usize>
    where
        F: Fn(usize) -> usize,
    {
        let mut counts: Vec<Option<usize>> = before.iter().copied().map(Some).collect();

        fn adjust(counts: &mut [Option<usize>], path: &IndexPath, insert: bool) {
            if let Some(Some(count)) = path.section_index().and_then(|s| counts.get_mut(s)) {
                if insert {
                    *count += 1;
                } else {
                    *count = count.saturating_sub(1);
                }
            }
        }

        for event in &self.events {
            match event {
                ChangeEvent::ItemsInserted(paths) => {
                    paths.iter().for_each(|path| adjust(&mut counts, path, true))
                }
                ChangeEvent::ItemsRemoved(paths) => {
                    paths.iter().for_each(|path| adjust(&mut counts, path, false))
                }
                ChangeEvent::ItemMoved { from, to } => {
                    adjust(&mut counts, from, false);
                    adjust(&mut counts, to, true);
                }
                ChangeEvent::ItemsRefreshed(_) | ChangeEvent::SupplementaryUpdated { .. } => {}
                ChangeEvent::SectionsInserted { sections, .. } => {
                    for &section in sections {
                        let at = section.min(counts.len());
                        counts.insert(at, None);
                    }
                }
                ChangeEvent::SectionsRemoved { sections, .. } => {
                    for &section in sections.iter().rev() {
                        if section < counts.len() {
                            counts.remove(section);
                        }
                    }
                }
                ChangeEvent::SectionMoved { from, to, .. } => {
                    if *from < counts.len() {
                        let moved = counts.remove(*from);
                        let at = (*to).min(counts.len());
                        counts.insert(at, moved);
                    }
                }
                ChangeEvent::SectionsRefreshed(sections) => {
                    for &section in sections {
                        if let Some(slot) = counts.get_mut(section) {
                            *slot = None;
                        }
                    }
                }
                ChangeEvent::ReloadData => counts.iter_mut().for_each(|slot| *slot = None),
            }
        }

        counts
            .into_iter()
            .enumerate()
            .map(|(section, count)| count.unwrap_or_else(|| after(section)))
            .collect()
    }
}

impl IntoIterator for ChangeBatch {
    type Item = ChangeEvent;
    type IntoIter = std::vec::IntoIter<ChangeEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
