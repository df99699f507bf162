//! Per-frame draw list of one renderer type

use crate::render::{DrawElementsCommand, SortOrder};

/// Draw commands produced for one renderer type in the current frame
///
/// Commands and distances are parallel arrays. Each batch appears at most
/// once; its instance count is the number of its instances written this
/// frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawList {
    commands: Vec<DrawElementsCommand>,
    distances: Vec<f32>,
    batch_entries: Vec<Option<usize>>,
    sort_order: SortOrder,
}

impl DrawList {
    /// Create an empty list with a sort order
    pub fn new(sort_order: SortOrder) -> Self {
        Self {
            commands: Vec::new(),
            distances: Vec::new(),
            batch_entries: Vec::new(),
            sort_order,
        }
    }

    /// Empty the list for a frame over `batch_count` batches
    pub fn clear(&mut self, batch_count: usize) {
        self.commands.clear();
        self.distances.clear();
        self.batch_entries.clear();
        self.batch_entries.resize(batch_count, None);
    }

    /// Record one written instance of `batch`
    ///
    /// The first instance of a batch appends a command copied from
    /// `template`; later ones raise its instance count. The recorded distance
    /// is the nearest instance for front-to-back lists and the farthest
    /// otherwise.
    pub fn push_instance(&mut self, batch: usize, template: &DrawElementsCommand, distance: f32) {
        if batch >= self.batch_entries.len() {
            self.batch_entries.resize(batch + 1, None);
        }
        match self.batch_entries[batch] {
            Some(entry) => {
                self.commands[entry].instance_count += 1;
                let recorded = &mut self.distances[entry];
                *recorded = match self.sort_order {
                    SortOrder::FrontToBack => recorded.min(distance),
                    _ => recorded.max(distance),
                };
            }
            None => {
                self.batch_entries[batch] = Some(self.commands.len());
                self.commands.push(DrawElementsCommand { instance_count: 1, ..*template });
                self.distances.push(distance);
            }
        }
    }

    /// Order the commands by distance when the renderer type asks for it
    ///
    /// Stable insertion sort; lists are small and nearly sorted from one
    /// frame to the next.
    pub fn sort(&mut self) {
        match self.sort_order {
            SortOrder::Unsorted => return,
            SortOrder::FrontToBack => insertion_sort_by_distance(&mut self.distances, &mut self.commands, |a, b| a > b),
            SortOrder::BackToFront => insertion_sort_by_distance(&mut self.distances, &mut self.commands, |a, b| a < b),
        }
        // batch positions no longer match after reordering
        self.batch_entries.iter_mut().for_each(|entry| *entry = None);
    }

    /// Commands in submission order
    pub fn commands(&self) -> &[DrawElementsCommand] {
        &self.commands
    }

    /// Distance of each command from the primary camera
    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    /// Sort order
    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command was recorded
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Total instances across all commands
    pub fn instance_count(&self) -> u32 {
        self.commands.iter().map(|command| command.instance_count).sum()
    }
}

/// Sort two parallel arrays by the first, moving an element left only while
/// `out_of_order(previous, current)` holds so equal keys keep their order
fn insertion_sort_by_distance<T>(
    keys: &mut [f32],
    values: &mut [T],
    out_of_order: impl Fn(f32, f32) -> bool,
) {
    debug_assert_eq!(keys.len(), values.len());
    for i in 1..keys.len() {
        let mut j = i;
        while j > 0 && out_of_order(keys[j - 1], keys[j]) {
            keys.swap(j - 1, j);
            values.swap(j - 1, j);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(first_index: u32) -> DrawElementsCommand {
        DrawElementsCommand { count: 6, instance_count: 0, first_index, base_vertex: 0, first_instance: first_index }
    }

    #[test]
    fn test_instances_of_a_batch_merge() {
        let mut list = DrawList::new(SortOrder::Unsorted);
        list.clear(2);
        list.push_instance(1, &template(1), 3.0);
        list.push_instance(0, &template(0), 1.0);
        list.push_instance(1, &template(1), 5.0);

        assert_eq!(list.len(), 2);
        assert_eq!(list.commands()[0].first_index, 1);
        assert_eq!(list.commands()[0].instance_count, 2);
        assert_eq!(list.instance_count(), 3);
    }

    #[test]
    fn test_back_to_front_sort() {
        let mut list = DrawList::new(SortOrder::BackToFront);
        list.clear(3);
        list.push_instance(0, &template(0), 2.0);
        list.push_instance(1, &template(1), 9.0);
        list.push_instance(2, &template(2), 4.0);
        list.sort();

        assert_eq!(list.distances(), &[9.0, 4.0, 2.0]);
        let order: Vec<u32> = list.commands().iter().map(|command| command.first_index).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_front_to_back_uses_nearest_instance() {
        let mut list = DrawList::new(SortOrder::FrontToBack);
        list.clear(2);
        list.push_instance(0, &template(0), 8.0);
        list.push_instance(0, &template(0), 1.0);
        list.push_instance(1, &template(1), 3.0);
        list.sort();

        assert_eq!(list.distances(), &[1.0, 3.0]);
        assert_eq!(list.commands()[0].first_index, 0);
    }

    #[test]
    fn test_sort_is_stable_for_equal_distances() {
        let mut list = DrawList::new(SortOrder::BackToFront);
        list.clear(4);
        list.push_instance(0, &template(0), 5.0);
        list.push_instance(1, &template(1), 7.0);
        list.push_instance(2, &template(2), 5.0);
        list.push_instance(3, &template(3), 5.0);
        list.sort();

        let order: Vec<u32> = list.commands().iter().map(|command| command.first_index).collect();
        assert_eq!(order, vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_unsorted_keeps_submission_order() {
        let mut list = DrawList::new(SortOrder::Unsorted);
        list.clear(2);
        list.push_instance(0, &template(0), 9.0);
        list.push_instance(1, &template(1), 1.0);
        list.sort();

        assert_eq!(list.distances(), &[9.0, 1.0]);
    }

    #[test]
    fn test_clear_resets() {
        let mut list = DrawList::new(SortOrder::Unsorted);
        list.clear(1);
        list.push_instance(0, &template(0), 1.0);
        list.clear(1);
        assert!(list.is_empty());
        list.push_instance(0, &template(0), 1.0);
        assert_eq!(list.commands()[0].instance_count, 1);
    }
}
