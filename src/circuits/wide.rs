use super::*;

/// Returns an IC applying the 1 bit `gate` to every bit of its [WORD] wide inputs `names`.
fn bitwise(
    label: &str,
    names: &[&str],
    gate: fn() -> Result<Ic, WiringError>,
) -> Result<Ic, WiringError> {
    let mut ic = Ic::new(label);
    let mut buses = Vec::with_capacity(names.len());
    for name in names {
        buses.push(ic.declare_input(*name, WORD)?);
    }
    ic.declare_output("out", WORD)?;

    let mut out = Vec::with_capacity(WORD);
    for bit in 0..WORD {
        let args: Vec<(&str, &[Connection])> = names
            .iter()
            .zip(&buses)
            .map(|(name, bus)| (*name, std::slice::from_ref(&bus[bit])))
            .collect();
        out.push(apply1(&mut ic, gate()?, &args)?);
    }
    ic.output("out", out)?;
    Ok(ic)
}

pub fn not16() -> Result<Ic, WiringError> {
    bitwise("Not16", &["in"], not)
}

pub fn and16() -> Result<Ic, WiringError> {
    bitwise("And16", &["a", "b"], and)
}

pub fn or16() -> Result<Ic, WiringError> {
    bitwise("Or16", &["a", "b"], or)
}

/// Returns a 16 bit multiplexer made of 16 [Muxes](mux), 64 NANDs.
pub fn mux16() -> Result<Ic, WiringError> {
    let mut ic = Ic::new("Mux16");
    let a = ic.declare_input("a", WORD)?;
    let b = ic.declare_input("b", WORD)?;
    let sel = ic.declare_input("sel", 1)?;
    ic.declare_output("out", WORD)?;
    let mut out = Vec::with_capacity(WORD);
    for bit in 0..WORD {
        out.push(apply1(
            &mut ic,
            mux()?,
            pins! { "a" => a[bit], "b" => b[bit], "sel" => sel },
        )?);
    }
    ic.output("out", out)?;
    Ok(ic)
}

/// Returns an IC whose output is the OR of the 8 bits of "in".
pub fn or8way() -> Result<Ic, WiringError> {
    let mut ic = Ic::new("Or8Way");
    let x = ic.declare_input("in", 8)?;
    ic.declare_output("out", 1)?;
    let mut acc = x[0].clone();
    for bit in &x[1..] {
        acc = apply1(&mut ic, or()?, pins! { "a" => acc, "b" => bit })?;
    }
    ic.output("out", acc)?;
    Ok(ic)
}

/// Returns a 4 way 16 bit multiplexer, "sel" picks among "a", "b", "c" and "d".
pub fn mux4way16() -> Result<Ic, WiringError> {
    let mut ic = Ic::new("Mux4Way16");
    let a = ic.declare_input("a", WORD)?;
    let b = ic.declare_input("b", WORD)?;
    let c = ic.declare_input("c", WORD)?;
    let d = ic.declare_input("d", WORD)?;
    let sel = ic.declare_input("sel", 2)?;
    ic.declare_output("out", WORD)?;
    let ab = apply(&mut ic, mux16()?, pins! { "a" => a, "b" => b, "sel" => sel[0] })?;
    let cd = apply(&mut ic, mux16()?, pins! { "a" => c, "b" => d, "sel" => sel[0] })?;
    let out = apply(&mut ic, mux16()?, pins! { "a" => ab, "b" => cd, "sel" => sel[1] })?;
    ic.output("out", out)?;
    Ok(ic)
}

/// Returns an 8 way 16 bit multiplexer, "sel" picks among "a" to "h".
pub fn mux8way16() -> Result<Ic, WiringError> {
    let mut ic = Ic::new("Mux8Way16");
    let names = ["a", "b", "c", "d", "e", "f", "g", "h"];
    let mut ways = Vec::with_capacity(names.len());
    for name in &names {
        ways.push(ic.declare_input(*name, WORD)?);
    }
    let sel = ic.declare_input("sel", 3)?;
    ic.declare_output("out", WORD)?;
    let low = apply(
        &mut ic,
        mux4way16()?,
        pins! { "a" => ways[0], "b" => ways[1], "c" => ways[2], "d" => ways[3], "sel" => sel[..2] },
    )?;
    let high = apply(
        &mut ic,
        mux4way16()?,
        pins! { "a" => ways[4], "b" => ways[5], "c" => ways[6], "d" => ways[7], "sel" => sel[..2] },
    )?;
    let out = apply(&mut ic, mux16()?, pins! { "a" => low, "b" => high, "sel" => sel[2] })?;
    ic.output("out", out)?;
    Ok(ic)
}

/// Instantiates a [dmux] and returns its outputs "a" and "b".
fn split(
    ic: &mut Ic,
    x: &Connection,
    sel: &Connection,
) -> Result<(Connection, Connection), WiringError> {
    let idx = ic.call(dmux()?, pins! { "in" => x, "sel" => sel })?;
    let a = ic.pin(idx, "a")?.swap_remove(0);
    let b = ic.pin(idx, "b")?.swap_remove(0);
    Ok((a, b))
}

/// Returns a 4 way demultiplexer, "in" is routed to the output among "a" to "d" picked by "sel".
pub fn dmux4way() -> Result<Ic, WiringError> {
    let mut ic = Ic::new("DMux4Way");
    let x = ic.declare_input("in", 1)?;
    let sel = ic.declare_input("sel", 2)?;
    let names = ["a", "b", "c", "d"];
    for name in &names {
        ic.declare_output(*name, 1)?;
    }
    let (low, high) = split(&mut ic, &x[0], &sel[1])?;
    let (a, b) = split(&mut ic, &low, &sel[0])?;
    let (c, d) = split(&mut ic, &high, &sel[0])?;
    for (name, out) in names.iter().zip([a, b, c, d]) {
        ic.output(name, out)?;
    }
    Ok(ic)
}

/// Returns an 8 way demultiplexer, "in" is routed to the output among "a" to "h" picked by "sel".
pub fn dmux8way() -> Result<Ic, WiringError> {
    let mut ic = Ic::new("DMux8Way");
    let x = ic.declare_input("in", 1)?;
    let sel = ic.declare_input("sel", 3)?;
    let names = ["a", "b", "c", "d", "e", "f", "g", "h"];
    for name in &names {
        ic.declare_output(*name, 1)?;
    }
    let (low, high) = split(&mut ic, &x[0], &sel[2])?;
    for (half, ways) in [(low, &names[..4]), (high, &names[4..])] {
        let idx = ic.call(dmux4way()?, pins! { "in" => half, "sel" => sel[..2] })?;
        for (way, name) in ["a", "b", "c", "d"].iter().zip(ways) {
            let out = ic.pin(idx, way)?;
            ic.output(name, out)?;
        }
    }
    Ok(ic)
}
