use super::*;

/// Returns the input of `idx` if it is a NOT gate, a NAND with both inputs wired together.
fn not_input(ic: &Ic, idx: ComponentIndex, subs: &Substitutions) -> Option<Connection> {
    if ic.components[idx.idx] != Component::Nand {
        return None;
    }
    match nand_inputs(ic, idx, subs) {
        Some((a, b)) if a == b => Some(a),
        _ => None,
    }
}

/// Whether walking back from `idx` through NOT gates only leads to `idx` again.
fn in_not_ring(ic: &Ic, idx: ComponentIndex, subs: &Substitutions) -> bool {
    let mut current = idx;
    for _ in 0..ic.len() {
        match not_input(ic, current, subs) {
            Some(input) if input.component == idx => return true,
            Some(input) => current = input.component,
            None => return false,
        }
    }
    false
}

// Replaces NOT(NOT(x)) with x. NOT rings are left alone, shortening them would turn an
// oscillator into a latch.
pub(super) fn double_negation_pass(ic: &mut Ic) -> usize {
    let mut subs = Substitutions::default();

    for idx in nands(ic) {
        let negated = match not_input(ic, idx, &subs) {
            Some(negated) => negated,
            None => continue,
        };
        let source = match not_input(ic, negated.component, &subs) {
            Some(source) => source,
            None => continue,
        };
        if source.component == idx || in_not_ring(ic, idx, &subs) {
            continue;
        }
        subs.insert(Connection::new(idx, "out", 0), source);
    }
    subs.apply(ic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_negation() {
        let mut ic = Ic::new("Test");
        let x = ic.declare_input("x", 1).unwrap();
        ic.declare_output("out", 1).unwrap();
        ic.declare_output("not", 1).unwrap();
        let n1 = ic.nand(&x[0], &x[0]).unwrap();
        let n2 = ic.nand(&n1, &n1).unwrap();
        let n3 = ic.nand(&n2, &x[0]).unwrap();
        ic.output("out", &n3).unwrap();
        ic.output("not", &n1).unwrap();

        let mut flat = ic.flatten().unwrap();
        assert_eq!(double_negation_pass(&mut flat), 1);
        assert_eq!(
            flat.producer_of(&Connection::new(n3.component, "a", 0)),
            Some(&x[0])
        );
        assert_eq!(double_negation_pass(&mut flat), 0);
    }

    #[test]
    fn test_not_ring_is_kept() {
        let mut ic = Ic::new("Test");
        ic.declare_output("out", 1).unwrap();
        let f = ic.forward(1).unwrap();
        let n1 = ic.nand(&f.bus()[0], &f.bus()[0]).unwrap();
        let n2 = ic.nand(&n1, &n1).unwrap();
        ic.resolve(f, &n2).unwrap();
        ic.output("out", &n2).unwrap();

        let mut flat = ic.flatten().unwrap();
        assert_eq!(double_negation_pass(&mut flat), 0);
    }

    /// Returns true if a component of `ic` other than the root consumes its own output.
    fn self_wired(ic: &Ic) -> bool {
        ic.wires().any(|(consumer, producer)| {
            !consumer.component.is_root() && consumer.component == producer.component
        })
    }

    #[test]
    fn test_odd_not_ring_is_kept() {
        let mut ic = Ic::new("Ring");
        ic.declare_output("out", 1).unwrap();
        let f = ic.forward(1).unwrap();
        let a = ic.nand(&f.bus()[0], &f.bus()[0]).unwrap();
        let b = ic.nand(&a, &a).unwrap();
        let c = ic.nand(&b, &b).unwrap();
        ic.resolve(f, &c).unwrap();
        ic.output("out", &c).unwrap();

        let optimized = ic.optimize().unwrap();
        assert!(!self_wired(&optimized));
        assert_eq!(optimized.len(), SPECIAL_COMPONENTS + 3);

        let config = crate::SimConfig {
            max_passes: 10,
            optimize: false,
        };
        let mut e = crate::synthesize(&optimized, &config).unwrap();
        assert!(matches!(
            e.get("out"),
            Err(crate::SimError::Convergence { passes: 10 })
        ));
    }

    #[test]
    fn test_latch_through_double_negation_isnt_self_wired() {
        let mut ic = Ic::new("Latch");
        let x = ic.declare_input("x", 1).unwrap();
        ic.declare_output("out", 1).unwrap();
        let f = ic.forward(1).unwrap();
        let gate = ic.nand(&f.bus()[0], &x[0]).unwrap();
        let not = ic.nand(&gate, &gate).unwrap();
        let not_not = ic.nand(&not, &not).unwrap();
        ic.resolve(f, &not_not).unwrap();
        ic.output("out", &gate).unwrap();

        let mut flat = ic.flatten().unwrap();
        double_negation_pass(&mut flat);
        assert!(!self_wired(&flat));
        assert!(!self_wired(&ic.optimize().unwrap()));
    }
}
