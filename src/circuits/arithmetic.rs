use super::*;

/// Returns a half adder with outputs "sum" and "carry".
pub fn half_adder() -> Result<Ic, WiringError> {
    let mut ic = Ic::new("HalfAdder");
    let a = ic.declare_input("a", 1)?;
    let b = ic.declare_input("b", 1)?;
    ic.declare_output("sum", 1)?;
    ic.declare_output("carry", 1)?;
    let sum = apply(&mut ic, xor()?, pins! { "a" => a, "b" => b })?;
    let carry = apply(&mut ic, and()?, pins! { "a" => a, "b" => b })?;
    ic.output("sum", sum)?;
    ic.output("carry", carry)?;
    Ok(ic)
}

/// Returns a full adder of "a", "b" and "c" with outputs "sum" and "carry".
pub fn full_adder() -> Result<Ic, WiringError> {
    let mut ic = Ic::new("FullAdder");
    let a = ic.declare_input("a", 1)?;
    let b = ic.declare_input("b", 1)?;
    let c = ic.declare_input("c", 1)?;
    ic.declare_output("sum", 1)?;
    ic.declare_output("carry", 1)?;
    let first = ic.call(half_adder()?, pins! { "a" => a, "b" => b })?;
    let partial = ic.pin(first, "sum")?;
    let second = ic.call(half_adder()?, pins! { "a" => partial, "b" => c })?;
    let c1 = ic.pin(first, "carry")?;
    let c2 = ic.pin(second, "carry")?;
    let carry = apply(&mut ic, or()?, pins! { "a" => c1, "b" => c2 })?;
    let sum = ic.pin(second, "sum")?;
    ic.output("sum", sum)?;
    ic.output("carry", carry)?;
    Ok(ic)
}

/// Returns a 16 bit ripple carry adder, the carry out is discarded.
///
/// # Example
/// ```
/// # use nandsim::{circuits::add16, SimConfig, synthesize_ic};
/// let mut e = synthesize_ic(&add16().unwrap(), &SimConfig::default()).unwrap();
/// e.set_i16("a", -7).unwrap();
/// e.set_i16("b", 3).unwrap();
/// assert_eq!(e.get_i16("out").unwrap(), -4);
/// ```
pub fn add16() -> Result<Ic, WiringError> {
    let mut ic = Ic::new("Add16");
    let a = ic.declare_input("a", WORD)?;
    let b = ic.declare_input("b", WORD)?;
    ic.declare_output("out", WORD)?;
    let mut carry = ic.constant(false);
    let mut out = Vec::with_capacity(WORD);
    for bit in 0..WORD {
        let adder = ic.call(
            full_adder()?,
            pins! { "a" => a[bit], "b" => b[bit], "c" => carry },
        )?;
        out.extend(ic.pin(adder, "sum")?);
        carry = ic.pin(adder, "carry")?.swap_remove(0);
    }
    ic.output("out", out)?;
    Ok(ic)
}

/// Returns a 16 bit incrementer: `out = in + 1`.
pub fn inc16() -> Result<Ic, WiringError> {
    let mut ic = Ic::new("Inc16");
    let x = ic.declare_input("in", WORD)?;
    ic.declare_output("out", WORD)?;
    let one = constant_bus(&ic, 1, WORD);
    let out = apply(&mut ic, add16()?, pins! { "a" => x, "b" => one })?;
    ic.output("out", out)?;
    Ok(ic)
}

/// Returns the 16 bit ALU.
///
/// Control bits are applied in order: "zx" zeroes "x", "nx" negates it, same for "y" with "zy"
/// and "ny". "f" selects `x + y` over `x & y` and "no" negates the result. "zr" is set when the
/// output is 0 and "ng" when it is negative.
pub fn alu() -> Result<Ic, WiringError> {
    let mut ic = Ic::new("ALU");
    let x = ic.declare_input("x", WORD)?;
    let y = ic.declare_input("y", WORD)?;
    let mut control = Vec::new();
    for name in &["zx", "nx", "zy", "ny", "f", "no"] {
        control.push(ic.declare_input(*name, 1)?.swap_remove(0));
    }
    let (zx, nx, zy, ny, f, no) = (
        &control[0],
        &control[1],
        &control[2],
        &control[3],
        &control[4],
        &control[5],
    );
    ic.declare_output("out", WORD)?;
    ic.declare_output("zr", 1)?;
    ic.declare_output("ng", 1)?;

    let zero = constant_bus(&ic, 0, WORD);
    let x = preset(&mut ic, &x, &zero, zx, nx)?;
    let y = preset(&mut ic, &y, &zero, zy, ny)?;

    let and = apply(&mut ic, and16()?, pins! { "a" => x, "b" => y })?;
    let sum = apply(&mut ic, add16()?, pins! { "a" => x, "b" => y })?;
    let result = apply(&mut ic, mux16()?, pins! { "a" => and, "b" => sum, "sel" => f })?;
    let negated = apply(&mut ic, not16()?, pins! { "in" => result })?;
    let out = apply(&mut ic, mux16()?, pins! { "a" => result, "b" => negated, "sel" => no })?;

    let low = apply1(&mut ic, or8way()?, pins! { "in" => out[..8] })?;
    let high = apply1(&mut ic, or8way()?, pins! { "in" => out[8..] })?;
    let any = apply1(&mut ic, or()?, pins! { "a" => low, "b" => high })?;
    let zr = apply(&mut ic, not()?, pins! { "in" => any })?;

    ic.output("zr", zr)?;
    ic.output("ng", &out[WORD - 1])?;
    ic.output("out", out)?;
    Ok(ic)
}

/// Zeroes `bus` if `z` and then negates it if `n`.
fn preset(
    ic: &mut Ic,
    bus: &[Connection],
    zero: &[Connection],
    z: &Connection,
    n: &Connection,
) -> Result<Vec<Connection>, WiringError> {
    let zeroed = apply(ic, mux16()?, pins! { "a" => bus, "b" => zero, "sel" => z })?;
    let negated = apply(ic, not16()?, pins! { "in" => zeroed })?;
    apply(ic, mux16()?, pins! { "a" => zeroed, "b" => negated, "sel" => n })
}
