use super::*;

/// Returns a 1 bit register: "out" takes the value of "in" after a clock cycle with "load" set.
pub fn bit() -> Result<Ic, WiringError> {
    let mut ic = Ic::new("Bit");
    let x = ic.declare_input("in", 1)?;
    let load = ic.declare_input("load", 1)?;
    ic.declare_output("out", 1)?;
    let feedback = ic.forward(1)?;
    let next = apply1(
        &mut ic,
        mux()?,
        pins! { "a" => feedback.bus(), "b" => x, "sel" => load },
    )?;
    let q = ic.dff(&next)?;
    ic.resolve(feedback, &q)?;
    ic.output("out", q)?;
    Ok(ic)
}

/// Returns a [WORD] wide register made of [bits](bit).
pub fn register() -> Result<Ic, WiringError> {
    let mut ic = Ic::new("Register");
    let x = ic.declare_input("in", WORD)?;
    let load = ic.declare_input("load", 1)?;
    ic.declare_output("out", WORD)?;
    let mut out = Vec::with_capacity(WORD);
    for input in &x {
        out.push(apply1(&mut ic, bit()?, pins! { "in" => input, "load" => load })?);
    }
    ic.output("out", out)?;
    Ok(ic)
}

/// Returns the program counter.
///
/// On every clock cycle "out" is cleared if "reset", set to "in" if "load",
/// incremented if "inc" and kept otherwise, in this priority.
pub fn pc() -> Result<Ic, WiringError> {
    let mut ic = Ic::new("PC");
    let x = ic.declare_input("in", WORD)?;
    let load = ic.declare_input("load", 1)?;
    let inc = ic.declare_input("inc", 1)?;
    let reset = ic.declare_input("reset", 1)?;
    ic.declare_output("out", WORD)?;

    let feedback = ic.forward(WORD)?;
    let current = feedback.bus();
    let incremented = apply(&mut ic, inc16()?, pins! { "in" => current })?;
    let next = apply(
        &mut ic,
        mux16()?,
        pins! { "a" => current, "b" => incremented, "sel" => inc },
    )?;
    let next = apply(&mut ic, mux16()?, pins! { "a" => next, "b" => x, "sel" => load })?;
    let zero = constant_bus(&ic, 0, WORD);
    let next = apply(&mut ic, mux16()?, pins! { "a" => next, "b" => zero, "sel" => reset })?;
    let on = ic.constant(true);
    let out = apply(&mut ic, register()?, pins! { "in" => next, "load" => on })?;
    ic.resolve(feedback, &out)?;
    ic.output("out", out)?;
    Ok(ic)
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use super::*;

    #[test]
    fn test_bit() {
        let mut e = evaluator(bit());
        e.set("in", 1).unwrap();
        assert_eq!(e.get("out").unwrap(), 0);
        e.tick_tock(1).unwrap();
        assert_eq!(e.get("out").unwrap(), 0);

        e.set("load", 1).unwrap();
        assert_eq!(e.get("out").unwrap(), 0);
        e.tick_tock(1).unwrap();
        assert_eq!(e.get("out").unwrap(), 1);

        e.set("in", 0).unwrap();
        e.set("load", 0).unwrap();
        e.tick_tock(3).unwrap();
        assert_eq!(e.get("out").unwrap(), 1);
    }

    #[test]
    fn test_register() {
        let mut e = evaluator(register());
        e.set("in", 0xbeef).unwrap();
        e.set("load", 1).unwrap();
        e.tick_tock(1).unwrap();
        e.set("in", 0x1234).unwrap();
        e.set("load", 0).unwrap();
        e.tick_tock(1).unwrap();
        assert_eq!(e.get("out").unwrap(), 0xbeef);
    }

    #[test]
    fn test_pc() {
        let mut e = evaluator(pc());
        e.set("inc", 1).unwrap();
        e.tick_tock(5).unwrap();
        assert_eq!(e.get("out").unwrap(), 5);

        e.set("in", 1000).unwrap();
        e.set("load", 1).unwrap();
        e.tick_tock(1).unwrap();
        assert_eq!(e.get("out").unwrap(), 1000);

        e.set("load", 0).unwrap();
        e.tick_tock(2).unwrap();
        assert_eq!(e.get("out").unwrap(), 1002);

        e.set("load", 1).unwrap();
        e.set("reset", 1).unwrap();
        e.tick_tock(1).unwrap();
        assert_eq!(e.get("out").unwrap(), 0);

        e.set("reset", 0).unwrap();
        e.set("load", 0).unwrap();
        e.set("inc", 0).unwrap();
        e.tick_tock(2).unwrap();
        assert_eq!(e.get("out").unwrap(), 0);
    }
}
