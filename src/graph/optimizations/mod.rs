mod const_absorption;
mod double_negation;
mod duplicate_elimination;
use const_absorption::*;
use double_negation::*;
use duplicate_elimination::*;

use super::component::*;
use super::connection::*;
use super::ic::Ic;
use crate::error::WiringError;
use std::collections::HashMap;

/// Producers to be replaced, with their replacements.
#[derive(Debug, Default)]
pub(super) struct Substitutions(HashMap<Connection, Connection>);

impl Substitutions {
    /// Every consumer of `from` will be wired to `to` instead.
    pub(super) fn insert(&mut self, from: Connection, to: Connection) {
        if from != to {
            self.0.insert(from, to);
        }
    }

    /// Returns the final replacement of `c`, or `c` itself if it isn't replaced.
    pub(super) fn resolve(&self, c: &Connection) -> Connection {
        let mut current = c;
        // Chains can't be longer than the map, a longer walk is a cycle.
        for _ in 0..=self.0.len() {
            match self.0.get(current) {
                Some(next) => current = next,
                None => break,
            }
        }
        current.clone()
    }

    /// Rewires every consumer of a replaced producer and returns the number of wires changed.
    ///
    /// A component is never wired to its own output, such wires keep their old producer.
    pub(super) fn apply(self, ic: &mut Ic) -> usize {
        if self.0.is_empty() {
            return 0;
        }
        let mut changes = 0;
        for (consumer, producer) in ic.wires.iter_mut() {
            let replacement = self.resolve(producer);
            if replacement.component == consumer.component && !consumer.component.is_root() {
                continue;
            }
            if replacement != *producer {
                *producer = replacement;
                changes += 1;
            }
        }
        changes
    }
}

/// Returns the indexes of every NAND gate in `ic`.
pub(super) fn nands(ic: &Ic) -> Vec<ComponentIndex> {
    ic.components
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == Component::Nand)
        .map(|(i, _)| ci!(i))
        .collect()
}

/// Returns the producers of the inputs of NAND `idx`, after substitutions.
pub(super) fn nand_inputs(
    ic: &Ic,
    idx: ComponentIndex,
    subs: &Substitutions,
) -> Option<(Connection, Connection)> {
    let a = ic.wires.get(&Connection::new(idx, "a", 0))?;
    let b = ic.wires.get(&Connection::new(idx, "b", 0))?;
    Some((subs.resolve(a), subs.resolve(b)))
}

/// Runs optimization `f` on `ic` and logs the number of wires it changed.
fn run_optimization<F: Fn(&mut Ic) -> usize>(ic: &mut Ic, f: F, name: &'static str) -> usize {
    let changes = f(ic);
    clilog::debug!("Optimization: {}, rewired: {}", name, changes);
    changes
}

impl Ic {
    /// Returns an equivalent flat [Ic] with fewer NAND gates.
    ///
    /// Runs constant absorption, double negation collapse and duplicate gate elimination
    /// until none of them changes anything, then flattens the result to drop dead gates.
    pub fn optimize(&self) -> Result<Ic, WiringError> {
        let mut ic = self.flatten()?;
        let old_len = ic.len();

        loop {
            let mut changes = 0;
            changes += run_optimization(&mut ic, const_absorption_pass, "constant absorption");
            changes += run_optimization(&mut ic, double_negation_pass, "double negation");
            changes += run_optimization(
                &mut ic,
                duplicate_elimination_pass,
                "duplicate elimination",
            );
            if changes == 0 {
                break;
            }
        }

        let ic = ic.flatten()?;
        clilog::info!(
            "Optimized {}, old size:{}, new size:{}, reduction: {:.1}%",
            ic.label(),
            old_len,
            ic.len(),
            (old_len - ic.len()) as f32 / old_len as f32 * 100.
        );
        Ok(ic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins;

    /// Returns every value of the declared outputs of `ic` for every value of its inputs.
    fn truth_table(ic: &Ic, optimize: bool) -> Vec<u64> {
        use crate::{synthesize_ic, SimConfig};
        let config = SimConfig {
            optimize,
            ..Default::default()
        };
        let mut e = synthesize_ic(ic, &config).unwrap();
        let inputs: Vec<(String, usize)> = ic
            .declared_inputs()
            .map(|(name, width)| (name.to_string(), width))
            .collect();
        let outputs: Vec<String> = ic.declared_outputs().map(|(name, _)| name.into()).collect();
        let bits: usize = inputs.iter().map(|(_, w)| w).sum();

        let mut table = Vec::new();
        for value in 0..1u64 << bits {
            let mut shift = 0;
            for (name, width) in &inputs {
                e.set(name, value >> shift).unwrap();
                shift += width;
            }
            for name in &outputs {
                table.push(e.get(name).unwrap());
            }
        }
        table
    }

    #[test]
    fn test_not_nand_with_on_vanishes() {
        let mut ic = Ic::new("Test");
        let x = ic.declare_input("x", 1).unwrap();
        ic.declare_output("out", 1).unwrap();
        let on = ic.constant(true);
        let n = ic.nand(&x[0], &on).unwrap();
        let not = ic.nand(&n, &n).unwrap();
        ic.output("out", &not).unwrap();

        let optimized = ic.optimize().unwrap();
        assert_eq!(optimized.len(), SPECIAL_COMPONENTS);
        assert_eq!(
            optimized.producer_of(&Connection::new(ROOT, "out", 0)),
            Some(&x[0])
        );
    }

    #[test]
    fn test_soundness() {
        let mut ic = Ic::new("Test");
        let a = ic.declare_input("a", 1).unwrap();
        let b = ic.declare_input("b", 1).unwrap();
        let c = ic.declare_input("c", 1).unwrap();
        ic.declare_output("x", 1).unwrap();
        ic.declare_output("y", 1).unwrap();
        ic.declare_output("z", 1).unwrap();
        let on = ic.constant(true);
        let off = ic.constant(false);

        let ab = ic.nand(&a[0], &b[0]).unwrap();
        let ba = ic.nand(&b[0], &a[0]).unwrap();
        let both = ic.nand(&ab, &ba).unwrap();
        let k = ic.nand(&both, &on).unwrap();
        let z = ic.nand(&k, &off).unwrap();
        let w = ic.nand(&z, &c[0]).unwrap();
        let nw = ic.nand(&w, &w).unwrap();
        let nnw = ic.nand(&nw, &nw).unwrap();
        let y = ic.nand(&nnw, &ab).unwrap();
        ic.output("x", &k).unwrap();
        ic.output("y", &y).unwrap();
        ic.output("z", &z).unwrap();

        assert_eq!(truth_table(&ic, false), truth_table(&ic, true));
        let before = ic.flatten().unwrap().len();
        let after = ic.optimize().unwrap().len();
        assert!(after < before);
    }

    #[test]
    fn test_xor_is_already_optimal() {
        let ic = crate::circuits::xor().unwrap();
        let optimized = ic.optimize().unwrap();
        assert_eq!(optimized.gate_count()[&PrimitiveKind::Nand], 4);
        assert_eq!(truth_table(&ic, false), truth_table(&ic, true));
    }

    #[test]
    fn test_mux16_soundness() {
        let mut ic = Ic::new("Test");
        let a = ic.declare_input("a", 2).unwrap();
        let b = ic.declare_input("b", 2).unwrap();
        let sel = ic.declare_input("sel", 1).unwrap();
        ic.declare_output("out", 2).unwrap();
        let mut out = Vec::new();
        for i in 0..2 {
            let m = ic
                .call(
                    crate::circuits::mux().unwrap(),
                    pins! { "a" => a[i], "b" => b[i], "sel" => sel },
                )
                .unwrap();
            out.extend(ic.pin(m, "out").unwrap());
        }
        ic.output("out", out).unwrap();
        assert_eq!(truth_table(&ic, false), truth_table(&ic, true));
    }
}
