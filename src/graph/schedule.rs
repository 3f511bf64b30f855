use super::component::*;
use super::connection::*;
use super::ic::Ic;
use smallvec::SmallVec;

/// Producers feeding the inputs of one component.
type Dependencies = SmallVec<[ComponentIndex; 2]>;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Visit {
    New,
    OnStack,
    Done,
}

/// Depth first search state, the stack is explicit so deep netlists can't overflow.
struct Dfs<'a> {
    dependencies: &'a [Dependencies],
    visits: Vec<Visit>,
    stack: Vec<(ComponentIndex, usize)>,
}

impl<'a> Dfs<'a> {
    fn new(dependencies: &'a [Dependencies]) -> Self {
        Dfs {
            dependencies,
            visits: vec![Visit::New; dependencies.len()],
            stack: Vec::new(),
        }
    }

    /// Visits everything `root` depends on and calls `visit` in post-order.
    ///
    /// Dependencies that are still on the stack close a cycle and are skipped.
    fn run<F: FnMut(ComponentIndex)>(&mut self, root: ComponentIndex, mut visit: F) {
        if self.visits[root.idx] != Visit::New {
            return;
        }
        self.visits[root.idx] = Visit::OnStack;
        self.stack.push((root, 0));

        while let Some((idx, next)) = self.stack.last_mut() {
            let idx = *idx;
            match self.dependencies[idx.idx].get(*next) {
                Some(&dependency) => {
                    *next += 1;
                    if self.visits[dependency.idx] == Visit::New {
                        self.visits[dependency.idx] = Visit::OnStack;
                        self.stack.push((dependency, 0));
                    }
                }
                None => {
                    self.stack.pop();
                    self.visits[idx.idx] = Visit::Done;
                    visit(idx);
                }
            }
        }
    }
}

/// Returns the producers of every component, following all inputs when `all` is true and only the
/// [combinational inputs](Component::combinational_inputs) otherwise.
fn dependencies(ic: &Ic, all: bool, reverse: bool) -> Vec<Dependencies> {
    let mut dependencies = vec![Dependencies::new(); ic.len()];
    for (consumer, producer) in ic.wires() {
        if consumer.component.is_root() {
            continue;
        }
        let component = &ic.components()[consumer.component.idx];
        if !all && !component.combinational_inputs().contains(&&*consumer.pin) {
            continue;
        }
        let deps = &mut dependencies[consumer.component.idx];
        if !deps.contains(&producer.component) {
            deps.push(producer.component);
        }
    }
    if reverse {
        dependencies.iter_mut().for_each(|deps| deps.reverse());
    }
    dependencies
}

/// Returns an evaluation order for the primitives of the flattened `ic`.
///
/// For every combinational dependency A -> B, A comes before B. Components without a combinational
/// behavior ([Dff](Component::Dff), [Output](Component::Output)) are placed at the end.
/// Feedback loops that aren't broken by a stateful component are cut at an arbitrary point.
///
/// # Panics
///
/// Will panic in debug mode if `ic` is not [flat](Ic::is_flat).
pub fn schedule(ic: &Ic) -> Vec<ComponentIndex> {
    schedule_visiting(ic, false)
}

/// [schedule] with the roots and every dependency list walked in reverse when `reverse` is set.
///
/// Both orders are valid, they only differ in how independent components are interleaved and
/// where unbroken feedback loops are cut.
pub(super) fn schedule_visiting(ic: &Ic, reverse: bool) -> Vec<ComponentIndex> {
    debug_assert!(ic.is_flat(), "Tried to schedule {} before flattening", ic.label());
    let components = ic.components();

    let mut roots: Vec<ComponentIndex> = ic
        .wires()
        .filter(|(consumer, _)| consumer.component.is_root())
        .map(|(_, producer)| producer.component)
        .collect();
    roots.extend(
        components
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, Component::Output(_)))
            .map(|(i, _)| ci!(i)),
    );

    // Pass 1: everything the roots depend on, stateful components included.
    let all = dependencies(ic, true, reverse);
    if reverse {
        roots.reverse();
    }
    let mut stateful = Vec::new();
    let mut reachable = vec![false; ic.len()];
    let mut dfs = Dfs::new(&all);
    for root in &roots {
        dfs.run(*root, |idx| {
            reachable[idx.idx] = true;
            if components[idx.idx].is_stateful() {
                stateful.push(idx)
            }
        });
    }

    // Pass 2: only combinational paths, starting over at the inputs of the stateful components.
    for s in &stateful {
        roots.extend(all[s.idx].iter().copied());
    }
    let combinational = dependencies(ic, false, reverse);
    let mut placed = vec![false; ic.len()];
    let mut order = Vec::with_capacity(ic.len());
    let mut dfs = Dfs::new(&combinational);
    for root in &roots {
        dfs.run(*root, |idx| {
            if !idx.is_special() && components[idx.idx].has_combine() {
                placed[idx.idx] = true;
                order.push(idx)
            }
        });
    }

    for (i, component) in components.iter().enumerate() {
        if reachable[i] && !placed[i] && component.has_combine() {
            order.push(ci!(i));
        }
    }
    for (i, component) in components.iter().enumerate() {
        if reachable[i] && !component.has_combine() && component.is_primitive() {
            order.push(ci!(i));
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins;

    fn position(order: &[ComponentIndex], c: &Connection) -> usize {
        order.iter().position(|idx| *idx == c.component).unwrap()
    }

    #[test]
    fn test_chain_order() {
        let mut ic = Ic::new("Test");
        let x = ic.declare_input("x", 1).unwrap();
        ic.declare_output("out", 1).unwrap();
        // Built backwards so the arena order is the opposite of the evaluation order.
        let f = ic.forward(1).unwrap();
        let last = ic.nand(&f.bus()[0], &f.bus()[0]).unwrap();
        let first = ic.nand(&x[0], &x[0]).unwrap();
        let middle = ic.nand(&first, &x[0]).unwrap();
        ic.resolve(f, &middle).unwrap();
        ic.output("out", &last).unwrap();

        let flat = ic.flatten().unwrap();
        let order = schedule(&flat);
        assert_eq!(order.len(), 3);

        let first = flat.producer_of(&Connection::new(ci!(6), "a", 0)).unwrap().clone();
        let o = |c: &Connection| position(&order, c);
        let last = flat
            .producer_of(&Connection::new(ROOT, "out", 0))
            .unwrap()
            .clone();
        let middle = flat
            .producer_of(&Connection::new(last.component, "a", 0))
            .unwrap()
            .clone();
        assert!(o(&first) < o(&middle));
        assert!(o(&middle) < o(&last));
    }

    #[test]
    fn test_stateful_at_the_end() {
        let mut ic = Ic::new("Test");
        let x = ic.declare_input("x", 1).unwrap();
        ic.declare_output("out", 1).unwrap();
        let f = ic.forward(1).unwrap();
        let n = ic.nand(&x[0], &f.bus()[0]).unwrap();
        let d = ic.dff(&n).unwrap();
        ic.resolve(f, &d).unwrap();
        ic.call(Component::Output(Port::new(1)), pins! { "in" => d })
            .unwrap();
        ic.output("out", &d).unwrap();

        let flat = ic.flatten().unwrap();
        let order = schedule(&flat);
        assert_eq!(order.len(), 3);
        assert_eq!(flat.components()[order[0].idx], Component::Nand);
        assert!(!flat.components()[order[1].idx].has_combine());
        assert!(!flat.components()[order[2].idx].has_combine());
    }

    #[test]
    fn test_ring_is_cut() {
        let mut ic = Ic::new("Ring");
        ic.declare_output("out", 1).unwrap();
        let f = ic.forward(1).unwrap();
        let a = ic.nand(&f.bus()[0], &f.bus()[0]).unwrap();
        let b = ic.nand(&a, &a).unwrap();
        let c = ic.nand(&b, &b).unwrap();
        ic.resolve(f, &c).unwrap();
        ic.output("out", &c).unwrap();

        let flat = ic.flatten().unwrap();
        let order = schedule(&flat);
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_ram_read_is_combinational() {
        let mut ic = Ic::new("Test");
        let address = ic.declare_input("address", 2).unwrap();
        ic.declare_output("out", 1).unwrap();
        let mem = Memory::new(2, 1).unwrap();
        let on = ic.constant(true);
        let ram = ic
            .call(
                Component::Ram(mem),
                pins! { "in" => on, "load" => on, "address" => address },
            )
            .unwrap();
        let read = ic.pin(ram, "out").unwrap();
        let n = ic.nand(&read[0], &read[0]).unwrap();
        ic.output("out", &n).unwrap();

        let flat = ic.flatten().unwrap();
        let order = schedule(&flat);
        let ram = flat.producer_of(&Connection::new(n.component, "a", 0));
        // The flattened arena keeps the original order, so indexes are unchanged.
        assert_eq!(ram, Some(&read[0]));
        assert!(position(&order, &read[0]) < position(&order, &n));
    }

    #[test]
    fn test_reverse_visit_is_another_valid_order() {
        let mut ic = Ic::new("Test");
        let x = ic.declare_input("x", 2).unwrap();
        ic.declare_output("out", 2).unwrap();
        let left = ic.nand(&x[0], &x[0]).unwrap();
        let right = ic.nand(&x[1], &x[1]).unwrap();
        let both = ic.nand(&left, &right).unwrap();
        let back = ic.nand(&both, &left).unwrap();
        ic.output("out", &[back, both.clone()]).unwrap();

        let flat = ic.flatten().unwrap();
        let forward = schedule(&flat);
        let reversed = schedule_visiting(&flat, true);
        assert_ne!(forward, reversed);

        let combinational = dependencies(&flat, false, false);
        for order in [&forward, &reversed] {
            assert_eq!(order.len(), 4);
            for (i, idx) in order.iter().enumerate() {
                for dependency in &combinational[idx.idx] {
                    if let Some(p) = order.iter().position(|o| o == dependency) {
                        assert!(p < i, "{} evaluated after its consumer {}", dependency, idx);
                    }
                }
            }
        }
    }
}
