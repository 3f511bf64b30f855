use super::component::*;
use super::connection::*;
use super::ic::Ic;
use crate::error::WiringError;
use indexmap::IndexMap;
use std::rc::Rc;
use unwrap::unwrap;

use Component::*;

/// Intermediate representation between a hierarchical [Ic] and its flattened version.
///
/// Child instances and placeholders stay in the arena as boundary nodes (`None`): their pins are
/// keys of `wires` that pass signals through, but they are never part of the result.
struct Flattener<'a> {
    ic: &'a Ic,
    nodes: Vec<Option<Component>>,
    /// Label of the IC every node was imported from.
    owners: Vec<Rc<str>>,
    wires: IndexMap<Connection, Connection>,
}

impl<'a> Flattener<'a> {
    /// Imports the flattened version of every child of `ic`.
    fn new(ic: &'a Ic) -> Result<Self, WiringError> {
        let label: Rc<str> = ic.label().into();
        let nodes: Vec<_> = ic
            .components
            .iter()
            .map(|component| match component {
                Component::Ic(_) | Forward(_) => None,
                component => Some(component.clone()),
            })
            .collect();
        let mut f = Flattener {
            ic,
            owners: vec![label; nodes.len()],
            nodes,
            wires: ic.wires.clone(),
        };

        for (i, component) in ic.components.iter().enumerate() {
            if let Component::Ic(child) = component {
                f.import(ci!(i), child.flatten()?);
            }
        }
        Ok(f)
    }

    /// Appends the primitives of `child` and its wires, the boundary of `child` becomes `instance`.
    fn import(&mut self, instance: ComponentIndex, child: Ic) {
        let offset = self.nodes.len() - SPECIAL_COMPONENTS;
        let map = |c: &Connection| {
            if c.component.is_root() {
                c.moved_to(instance)
            } else if c.component.is_special() {
                c.clone()
            } else {
                c.moved_to(ci!(c.component.idx + offset))
            }
        };
        let label: Rc<str> = child.label().into();
        let Ic {
            components, wires, ..
        } = child;

        for (consumer, producer) in &wires {
            self.wires.insert(map(consumer), map(producer));
        }
        for component in components.into_iter().skip(SPECIAL_COMPONENTS) {
            self.nodes.push(Some(component));
            self.owners.push(label.clone());
        }
    }

    fn is_boundary(&self, idx: ComponentIndex) -> bool {
        matches!(self.nodes.get(idx.idx), Some(None))
    }

    fn label_of(&self, c: &Connection) -> String {
        if c.component.idx < self.ic.len() {
            return self.ic.label_of(c);
        }
        let kind = match &self.nodes[c.component.idx] {
            Some(component) => component.name(),
            None => "?",
        };
        format!(
            "{}/{}#{}.{}[{}]",
            self.owners[c.component.idx], kind, c.component, c.pin, c.bit
        )
    }

    /// Follows pass-through wires across boundaries until a primitive or special producer is found.
    fn resolve_producer(&self, producer: &Connection) -> Result<Connection, WiringError> {
        let mut current = producer;
        for _ in 0..=self.wires.len() {
            if !self.is_boundary(current.component) {
                return Ok(current.clone());
            }
            current = self
                .wires
                .get(current)
                .ok_or_else(|| WiringError::Unconnected {
                    label: self.label_of(current),
                })?;
        }
        Err(WiringError::BoundaryLoop {
            label: self.label_of(producer),
        })
    }

    /// Returns the wires of every non boundary consumer, with their producers resolved.
    ///
    /// Resolution errors are only reported if the consumer turns out to be reachable.
    fn resolved_wires(&self) -> IndexMap<Connection, Result<Connection, WiringError>> {
        self.wires
            .iter()
            .filter(|(consumer, _)| !self.is_boundary(consumer.component))
            .map(|(consumer, producer)| (consumer.clone(), self.resolve_producer(producer)))
            .collect()
    }

    /// Returns which nodes are reachable from the declared outputs and from output stubs.
    fn reachable(
        &self,
        wires: &IndexMap<Connection, Result<Connection, WiringError>>,
    ) -> Result<Vec<bool>, WiringError> {
        let producer = |consumer: Connection| match wires.get(&consumer) {
            Some(Ok(producer)) => Ok(producer.component),
            Some(Err(e)) => Err(e.clone()),
            None => Err(WiringError::Unconnected {
                label: self.label_of(&consumer),
            }),
        };

        let mut work = Vec::new();
        for (name, width) in self.ic.declared_outputs() {
            for bit in 0..width {
                work.push(producer(Connection::new(ROOT, name, bit))?);
            }
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(Output(_)) = node {
                work.push(ci!(i));
            }
        }

        let mut reachable = vec![false; self.nodes.len()];
        while let Some(idx) = work.pop() {
            if reachable[idx.idx] {
                continue;
            }
            reachable[idx.idx] = true;
            if idx.is_special() {
                continue;
            }
            if let Some(component) = &self.nodes[idx.idx] {
                for (pin, width) in component.inputs() {
                    for bit in 0..width {
                        work.push(producer(Connection::new(idx, pin, bit))?);
                    }
                }
            }
        }
        Ok(reachable)
    }

    /// Returns a new [Ic] with only the reachable primitives, placed contiguously after the
    /// special components in their original order.
    fn compacted(self) -> Result<Ic, WiringError> {
        let wires = self.resolved_wires();
        let reachable = self.reachable(&wires)?;

        let mut ic = self.ic.empty_like();
        let mut index_map: Vec<Option<ComponentIndex>> = vec![None; self.nodes.len()];
        for (i, node) in self.nodes.into_iter().enumerate() {
            if i < SPECIAL_COMPONENTS {
                index_map[i] = Some(ci!(i));
                continue;
            }
            if let (true, Some(component)) = (reachable[i], node) {
                index_map[i] = Some(ic.add(component));
            }
        }

        for (consumer, producer) in wires {
            let producer = match producer {
                Ok(producer) => producer,
                Err(_) => continue,
            };
            let consumer = match index_map[consumer.component.idx] {
                Some(idx) if consumer.component.is_root() || reachable[consumer.component.idx] => {
                    consumer.moved_to(idx)
                }
                _ => continue,
            };
            let idx = unwrap!(
                index_map[producer.component.idx],
                "The producer {} of reachable consumer {} was pruned",
                producer,
                consumer
            );
            ic.wires.insert(consumer, producer.moved_to(idx));
        }
        Ok(ic)
    }
}

impl Ic {
    /// Returns a new [Ic] with the same ports as `self` that only contains primitives.
    ///
    /// Every child IC is flattened recursively and its primitives imported, wires crossing child
    /// boundaries are rewired to the primitives that actually produce the signals. Only the components
    /// reachable from the declared outputs and from [Output](Component::Output) stubs are kept.
    ///
    /// Flattening an already flat IC where every component is reachable returns an equal IC.
    ///
    /// # Errors
    ///
    /// [WiringError::Unconnected] if a reachable consumer pin has no producer,
    /// [WiringError::UnresolvedForward] if any wire is produced by an unresolved placeholder and
    /// [WiringError::BoundaryLoop] if pass-through wires form a loop.
    pub fn flatten(&self) -> Result<Ic, WiringError> {
        for producer in self.wires.values() {
            if let Some(Forward(Placeholder::Unresolved { .. })) = self.component(producer.component) {
                return Err(WiringError::UnresolvedForward {
                    label: self.label_of(producer),
                });
            }
        }
        Flattener::new(self)?.compacted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins;

    fn not_gate() -> Ic {
        let mut ic = Ic::new("Not");
        let x = ic.declare_input("in", 1).unwrap();
        ic.declare_output("out", 1).unwrap();
        let n = ic.nand(&x[0], &x[0]).unwrap();
        ic.output("out", &n).unwrap();
        ic
    }

    fn wire_gate() -> Ic {
        let mut ic = Ic::new("Wire");
        let x = ic.declare_input("in", 1).unwrap();
        ic.declare_output("out", 1).unwrap();
        ic.output("out", &x).unwrap();
        ic
    }

    fn nand_count(ic: &Ic) -> usize {
        ic.components()
            .iter()
            .filter(|c| c.kind() == Some(PrimitiveKind::Nand))
            .count()
    }

    #[test]
    fn test_flatten_child() {
        let mut ic = Ic::new("And");
        let a = ic.declare_input("a", 1).unwrap();
        let b = ic.declare_input("b", 1).unwrap();
        ic.declare_output("out", 1).unwrap();
        let n = ic.nand(&a[0], &b[0]).unwrap();
        let not = ic.call(not_gate(), pins! { "in" => n }).unwrap();
        let out = ic.pin(not, "out").unwrap();
        ic.output("out", out).unwrap();

        let flat = ic.flatten().unwrap();
        assert!(flat.is_flat());
        assert_eq!(flat.len(), SPECIAL_COMPONENTS + 2);
        assert_eq!(nand_count(&flat), 2);

        let first = ci!(SPECIAL_COMPONENTS);
        let second = ci!(SPECIAL_COMPONENTS + 1);
        assert_eq!(
            flat.producer_of(&Connection::new(ROOT, "out", 0)),
            Some(&Connection::new(second, "out", 0))
        );
        assert_eq!(
            flat.producer_of(&Connection::new(second, "a", 0)),
            Some(&Connection::new(first, "out", 0))
        );
        assert_eq!(
            flat.producer_of(&Connection::new(first, "b", 0)),
            Some(&Connection::new(ROOT, "b", 0))
        );
    }

    #[test]
    fn test_flatten_idempotent() {
        let mut ic = Ic::new("Test");
        let x = ic.declare_input("x", 1).unwrap();
        ic.declare_output("out", 1).unwrap();
        let a = ic.call(not_gate(), pins! { "in" => x }).unwrap();
        let a = ic.pin(a, "out").unwrap();
        let b = ic.call(not_gate(), pins! { "in" => a }).unwrap();
        let b = ic.pin(b, "out").unwrap();
        let d = ic.dff(&b[0]).unwrap();
        ic.output("out", &d).unwrap();

        let flat = ic.flatten().unwrap();
        assert_eq!(flat.flatten().unwrap(), flat);
    }

    #[test]
    fn test_passthrough_chain() {
        let mut inner = Ic::new("Outer");
        let x = inner.declare_input("in", 1).unwrap();
        inner.declare_output("out", 1).unwrap();
        let w = inner.call(wire_gate(), pins! { "in" => x }).unwrap();
        let w = inner.pin(w, "out").unwrap();
        let w = inner.call(wire_gate(), pins! { "in" => w }).unwrap();
        let w = inner.pin(w, "out").unwrap();
        inner.output("out", w).unwrap();

        let mut ic = Ic::new("Test");
        let x = ic.declare_input("x", 1).unwrap();
        ic.declare_output("y", 1).unwrap();
        let w = ic.call(inner, pins! { "in" => x }).unwrap();
        let w = ic.pin(w, "out").unwrap();
        ic.output("y", w).unwrap();

        let flat = ic.flatten().unwrap();
        assert_eq!(flat.len(), SPECIAL_COMPONENTS);
        assert_eq!(
            flat.producer_of(&Connection::new(ROOT, "y", 0)),
            Some(&Connection::new(ROOT, "x", 0))
        );
    }

    #[test]
    fn test_child_constants() {
        let mut child = Ic::new("One");
        child.declare_output("out", 1).unwrap();
        let on = child.constant(true);
        child.output("out", on).unwrap();

        let mut ic = Ic::new("Test");
        ic.declare_output("out", 1).unwrap();
        let c = ic.call(child, pins! {}).unwrap();
        let out = ic.pin(c, "out").unwrap();
        ic.output("out", out).unwrap();

        let flat = ic.flatten().unwrap();
        assert_eq!(
            flat.producer_of(&Connection::new(ROOT, "out", 0)),
            Some(&Connection::new(ON, "out", 0))
        );
    }

    #[test]
    fn test_prune() {
        let mut ic = Ic::new("Test");
        let x = ic.declare_input("x", 1).unwrap();
        ic.declare_output("out", 1).unwrap();
        let used = ic.nand(&x[0], &x[0]).unwrap();
        ic.nand(&x[0], &used).unwrap();
        // Unreachable, so the missing input doesn't matter.
        ic.add(Nand);
        ic.output("out", &used).unwrap();

        let flat = ic.flatten().unwrap();
        assert_eq!(nand_count(&flat), 1);
        assert_eq!(flat.wires().count(), 3);
    }

    #[test]
    fn test_output_stubs_are_kept() {
        let mut ic = Ic::new("Test");
        let x = ic.declare_input("x", 1).unwrap();
        let n = ic.nand(&x[0], &x[0]).unwrap();
        ic.call(Output(Port::new(1)), pins! { "in" => n }).unwrap();

        let flat = ic.flatten().unwrap();
        assert_eq!(flat.len(), SPECIAL_COMPONENTS + 2);
    }

    #[test]
    fn test_unconnected() {
        let mut ic = Ic::new("Test");
        let x = ic.declare_input("x", 1).unwrap();
        ic.declare_output("out", 1).unwrap();
        let n = ic.call(Nand, pins! { "a" => x }).unwrap();
        ic.output("out", ic.pin(n, "out").unwrap()).unwrap();

        assert_eq!(
            ic.flatten(),
            Err(WiringError::Unconnected {
                label: "Test/Nand#4.b[0]".into()
            })
        );

        let mut ic = Ic::new("Test");
        ic.declare_output("out", 1).unwrap();
        assert!(matches!(
            ic.flatten(),
            Err(WiringError::Unconnected { .. })
        ));
    }

    #[test]
    fn test_unconnected_child_input() {
        let mut ic = Ic::new("Test");
        ic.declare_output("out", 1).unwrap();
        let not = ic.call(not_gate(), pins! {}).unwrap();
        ic.output("out", ic.pin(not, "out").unwrap()).unwrap();

        assert_eq!(
            ic.flatten(),
            Err(WiringError::Unconnected {
                label: "Test/Not#4.in[0]".into()
            })
        );
    }

    #[test]
    fn test_unresolved_forward() {
        let mut ic = Ic::new("Test");
        ic.declare_output("out", 1).unwrap();
        let f = ic.forward(1).unwrap();
        ic.output("out", f.bus()).unwrap();
        assert!(matches!(
            ic.flatten(),
            Err(WiringError::UnresolvedForward { .. })
        ));
    }

    #[test]
    fn test_boundary_loop() {
        let mut ic = Ic::new("Test");
        ic.declare_output("out", 1).unwrap();
        let w1 = ic.add(wire_gate());
        let w2 = ic.add(wire_gate());
        ic.wire(
            Connection::new(w2, "out", 0),
            Connection::new(w1, "in", 0),
        )
        .unwrap();
        ic.wire(
            Connection::new(w1, "out", 0),
            Connection::new(w2, "in", 0),
        )
        .unwrap();
        ic.output("out", ic.pin(w1, "out").unwrap()).unwrap();

        assert!(matches!(
            ic.flatten(),
            Err(WiringError::BoundaryLoop { .. })
        ));
    }
}
