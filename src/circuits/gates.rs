use super::*;

/// Returns an IC with 1 bit inputs `names` and a 1 bit output "out".
pub(crate) fn gate(
    label: &str,
    names: &[&str],
) -> Result<(Ic, Vec<Connection>), WiringError> {
    let mut ic = Ic::new(label);
    let mut inputs = Vec::with_capacity(names.len());
    for name in names {
        inputs.push(ic.declare_input(*name, 1)?.swap_remove(0));
    }
    ic.declare_output("out", 1)?;
    Ok((ic, inputs))
}

/// Returns a NOT gate: `out = !in`. 1 NAND.
pub fn not() -> Result<Ic, WiringError> {
    let (mut ic, x) = gate("Not", &["in"])?;
    let out = ic.nand(&x[0], &x[0])?;
    ic.output("out", out)?;
    Ok(ic)
}

/// Returns an AND gate. 2 NANDs.
pub fn and() -> Result<Ic, WiringError> {
    let (mut ic, x) = gate("And", &["a", "b"])?;
    let n = ic.nand(&x[0], &x[1])?;
    let out = apply(&mut ic, not()?, pins! { "in" => n })?;
    ic.output("out", out)?;
    Ok(ic)
}

/// Returns an OR gate. 3 NANDs.
pub fn or() -> Result<Ic, WiringError> {
    let (mut ic, x) = gate("Or", &["a", "b"])?;
    let na = apply1(&mut ic, not()?, pins! { "in" => x[0] })?;
    let nb = apply1(&mut ic, not()?, pins! { "in" => x[1] })?;
    let out = ic.nand(&na, &nb)?;
    ic.output("out", out)?;
    Ok(ic)
}

/// Returns a XOR gate. 4 NANDs.
///
/// # Example
/// ```
/// # use nandsim::{circuits::xor, PrimitiveKind};
/// let ic = xor().unwrap();
/// assert_eq!(ic.gate_count()[&PrimitiveKind::Nand], 4);
/// ```
pub fn xor() -> Result<Ic, WiringError> {
    let (mut ic, x) = gate("Xor", &["a", "b"])?;
    let t = ic.nand(&x[0], &x[1])?;
    let at = ic.nand(&x[0], &t)?;
    let bt = ic.nand(&x[1], &t)?;
    let out = ic.nand(&at, &bt)?;
    ic.output("out", out)?;
    Ok(ic)
}

/// Returns a multiplexer: `out = if sel { b } else { a }`. 4 NANDs.
pub fn mux() -> Result<Ic, WiringError> {
    let (mut ic, x) = gate("Mux", &["a", "b", "sel"])?;
    let (a, b, sel) = (&x[0], &x[1], &x[2]);
    let nsel = apply1(&mut ic, not()?, pins! { "in" => sel })?;
    let pick_a = ic.nand(a, &nsel)?;
    let pick_b = ic.nand(b, sel)?;
    let out = ic.nand(&pick_a, &pick_b)?;
    ic.output("out", out)?;
    Ok(ic)
}

/// Returns a demultiplexer: `a = if sel { 0 } else { in }`, `b = if sel { in } else { 0 }`. 5 NANDs.
pub fn dmux() -> Result<Ic, WiringError> {
    let mut ic = Ic::new("DMux");
    let x = ic.declare_input("in", 1)?;
    let sel = ic.declare_input("sel", 1)?;
    ic.declare_output("a", 1)?;
    ic.declare_output("b", 1)?;
    let nsel = apply1(&mut ic, not()?, pins! { "in" => sel })?;
    let a = apply(&mut ic, and()?, pins! { "a" => x, "b" => nsel })?;
    let b = apply(&mut ic, and()?, pins! { "a" => x, "b" => sel })?;
    ic.output("a", a)?;
    ic.output("b", b)?;
    Ok(ic)
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use super::*;

    fn truth_table(ic: Result<Ic, WiringError>, inputs: &[&str]) -> Vec<u64> {
        let mut e = evaluator(ic);
        let mut table = Vec::new();
        for value in 0..1u64 << inputs.len() {
            for (i, name) in inputs.iter().enumerate() {
                e.set(name, value >> i & 1).unwrap();
            }
            table.push(e.get("out").unwrap());
        }
        table
    }

    #[test]
    fn test_truth_tables() {
        // Rows are ordered with the first input as the least significant bit.
        assert_eq!(truth_table(not(), &["in"]), [1, 0]);
        assert_eq!(truth_table(and(), &["a", "b"]), [0, 0, 0, 1]);
        assert_eq!(truth_table(or(), &["a", "b"]), [0, 1, 1, 1]);
        assert_eq!(truth_table(xor(), &["a", "b"]), [0, 1, 1, 0]);
        assert_eq!(
            truth_table(mux(), &["a", "b", "sel"]),
            [0, 1, 0, 1, 0, 0, 1, 1]
        );
    }

    #[test]
    fn test_dmux() {
        let mut e = evaluator(dmux());
        for (x, sel, a, b) in [(0, 0, 0, 0), (0, 1, 0, 0), (1, 0, 1, 0), (1, 1, 0, 1)] {
            e.set("in", x).unwrap();
            e.set("sel", sel).unwrap();
            assert_eq!(e.get("a").unwrap(), a);
            assert_eq!(e.get("b").unwrap(), b);
        }
    }

    #[test]
    fn test_gate_counts() {
        assert_eq!(nands(not()), 1);
        assert_eq!(nands(and()), 2);
        assert_eq!(nands(or()), 3);
        assert_eq!(nands(xor()), 4);
        assert_eq!(nands(mux()), 4);
        assert_eq!(nands(dmux()), 5);
    }
}
