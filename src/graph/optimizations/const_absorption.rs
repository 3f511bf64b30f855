use super::*;

// Absorbs the constant inputs of NAND gates:
// NAND(c, c) = NOT c, NAND(x, 0) = 1 and NAND(x, 1) = NAND(x, x).
pub(super) fn const_absorption_pass(ic: &mut Ic) -> usize {
    let mut subs = Substitutions::default();
    let mut changes = 0;

    for idx in nands(ic) {
        let (a, b) = match nand_inputs(ic, idx, &subs) {
            Some(inputs) => inputs,
            None => continue,
        };
        if !a.component.is_const() && !b.component.is_const() {
            continue;
        }
        let out = Connection::new(idx, "out", 0);
        if a == b {
            if let Some(not) = a.component.opposite_if_const() {
                subs.insert(out, Connection::new(not, "out", 0));
            }
            continue;
        }
        match (a.component, b.component) {
            (OFF, _) | (_, OFF) => subs.insert(out, Connection::new(ON, "out", 0)),
            _ => {
                let other = if a.component == ON { b } else { a };
                for pin in ["a", "b"] {
                    if let Some(producer) = ic.wires.get_mut(&Connection::new(idx, pin, 0)) {
                        if *producer != other {
                            *producer = other.clone();
                            changes += 1;
                        }
                    }
                }
            }
        }
    }
    changes + subs.apply(ic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorption() {
        let mut ic = Ic::new("Test");
        let x = ic.declare_input("x", 1).unwrap();
        ic.declare_output("zero", 1).unwrap();
        ic.declare_output("one", 1).unwrap();
        ic.declare_output("not", 1).unwrap();
        let on = ic.constant(true);
        let off = ic.constant(false);

        let one = ic.nand(&x[0], &off).unwrap();
        let zero = ic.nand(&on, &on).unwrap();
        let not = ic.nand(&on, &x[0]).unwrap();
        ic.output("zero", &zero).unwrap();
        ic.output("one", &one).unwrap();
        ic.output("not", &not).unwrap();

        let mut flat = ic.flatten().unwrap();
        assert_eq!(const_absorption_pass(&mut flat), 3);
        assert_eq!(const_absorption_pass(&mut flat), 0);

        assert_eq!(flat.producer_of(&Connection::new(ROOT, "zero", 0)), Some(&off));
        assert_eq!(flat.producer_of(&Connection::new(ROOT, "one", 0)), Some(&on));
        assert_eq!(
            flat.producer_of(&Connection::new(not.component, "a", 0)),
            Some(&x[0])
        );
        assert_eq!(
            flat.producer_of(&Connection::new(not.component, "b", 0)),
            Some(&x[0])
        );
    }

    #[test]
    fn test_cascade() {
        let mut ic = Ic::new("Test");
        ic.declare_output("out", 1).unwrap();
        let off = ic.constant(false);
        let one = ic.nand(&off, &off).unwrap();
        let zero = ic.nand(&one, &one).unwrap();
        let one_again = ic.nand(&zero, &one).unwrap();
        ic.output("out", &one_again).unwrap();

        let mut flat = ic.flatten().unwrap();
        const_absorption_pass(&mut flat);
        assert_eq!(
            flat.producer_of(&Connection::new(ROOT, "out", 0)),
            Some(&ic.constant(true))
        );
    }

    #[test]
    fn test_equal_constants_are_negated() {
        let mut ic = Ic::new("Test");
        ic.declare_output("out", 2).unwrap();
        let on = ic.constant(true);
        let off = ic.constant(false);
        let one = ic.nand(&off, &off).unwrap();
        let zero = ic.nand(&on, &on).unwrap();
        ic.output("out", [zero, one]).unwrap();

        let mut flat = ic.flatten().unwrap();
        assert_eq!(const_absorption_pass(&mut flat), 2);
        assert_eq!(flat.producer_of(&Connection::new(ROOT, "out", 0)), Some(&off));
        assert_eq!(flat.producer_of(&Connection::new(ROOT, "out", 1)), Some(&on));
        assert_eq!(flat.optimize().unwrap().len(), SPECIAL_COMPONENTS);
    }
}
