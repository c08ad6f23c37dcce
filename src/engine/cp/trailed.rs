use crate::basic_types::Trail;
use crate::containers::KeyedVec;
use crate::containers::StorageKey;

/// A handle to an integer cell stored in [`TrailedValues`]; modifications are journaled so
/// that backtracking restores the previous value.
#[derive(Debug, Clone, Copy)]
pub struct TrailedInteger {
    id: u32,
}

impl Default for TrailedInteger {
    fn default() -> Self {
        Self { id: u32::MAX }
    }
}

impl StorageKey for TrailedInteger {
    fn index(&self) -> usize {
        self.id as usize
    }

    fn create_from_index(index: usize) -> Self {
        Self { id: index as u32 }
    }
}

#[derive(Debug, Clone)]
struct TrailedChange {
    old_value: i64,
    reference: TrailedInteger,
}

/// The backtrackable integer store of the trailed environment.
#[derive(Default, Debug, Clone)]
pub struct TrailedValues {
    trail: Trail<TrailedChange>,
    values: KeyedVec<TrailedInteger, i64>,
}

impl TrailedValues {
    pub(crate) fn grow(&mut self, initial_value: i64) -> TrailedInteger {
        self.values.push(initial_value)
    }

    pub(crate) fn increase_decision_level(&mut self) {
        self.trail.increase_decision_level()
    }

    pub(crate) fn read(&self, trailed_integer: TrailedInteger) -> i64 {
        self.values[trailed_integer]
    }

    pub(crate) fn synchronise(&mut self, new_decision_level: usize) {
        let TrailedValues { trail, values } = self;
        trail
            .synchronise(new_decision_level)
            .for_each(|state_change| values[state_change.reference] = state_change.old_value)
    }

    fn write(&mut self, trailed_integer: TrailedInteger, value: i64) {
        let old_value = self.values[trailed_integer];
        if old_value == value {
            return;
        }
        let entry = TrailedChange {
            old_value,
            reference: trailed_integer,
        };
        self.trail.push(entry);
        self.values[trailed_integer] = value;
    }

    pub(crate) fn add_assign(&mut self, trailed_integer: TrailedInteger, addition: i64) {
        self.write(trailed_integer, self.values[trailed_integer] + addition);
    }

    pub(crate) fn assign(&mut self, trailed_integer: TrailedInteger, value: i64) {
        self.write(trailed_integer, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_undone_by_synchronising() {
        let mut values = TrailedValues::default();
        let trailed_integer = values.grow(0);

        assert_eq!(values.read(trailed_integer), 0);

        values.increase_decision_level();
        values.add_assign(trailed_integer, 5);

        assert_eq!(values.read(trailed_integer), 5);

        values.add_assign(trailed_integer, 5);
        assert_eq!(values.read(trailed_integer), 10);

        values.increase_decision_level();
        values.assign(trailed_integer, 11);

        assert_eq!(values.read(trailed_integer), 11);

        values.synchronise(1);
        assert_eq!(values.read(trailed_integer), 10);

        values.synchronise(0);
        assert_eq!(values.read(trailed_integer), 0);
    }
}
