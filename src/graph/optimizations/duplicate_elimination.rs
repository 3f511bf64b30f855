use super::*;
use std::collections::hash_map::Entry;

// Merges NAND gates with the same inputs, in any order, into the first of them.
pub(super) fn duplicate_elimination_pass(ic: &mut Ic) -> usize {
    let mut subs = Substitutions::default();
    let mut seen = HashMap::<(Connection, Connection), ComponentIndex>::new();

    for idx in nands(ic) {
        let key = match nand_inputs(ic, idx, &subs) {
            Some((a, b)) if a <= b => (a, b),
            Some((a, b)) => (b, a),
            None => continue,
        };
        match seen.entry(key) {
            Entry::Occupied(first) => subs.insert(
                Connection::new(idx, "out", 0),
                Connection::new(*first.get(), "out", 0),
            ),
            Entry::Vacant(slot) => {
                slot.insert(idx);
            }
        }
    }
    subs.apply(ic)
}
