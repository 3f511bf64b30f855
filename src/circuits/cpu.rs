use super::*;

/// Bits of a C-instruction, an A-instruction has the highest bit cleared.
mod instruction {
    pub const JGT: usize = 0;
    pub const JEQ: usize = 1;
    pub const JLT: usize = 2;
    pub const DEST_M: usize = 3;
    pub const DEST_D: usize = 4;
    pub const DEST_A: usize = 5;
    /// "zx nx zy ny f no" of the ALU, in this order.
    pub const COMP: [usize; 6] = [11, 10, 9, 8, 7, 6];
    /// Selects the memory operand "inM" over the A register.
    pub const A: usize = 12;
    pub const C: usize = 15;
}

/// Returns `a & b` through a new [and] gate.
fn both(ic: &mut Ic, a: &Connection, b: &Connection) -> Result<Connection, WiringError> {
    apply1(ic, and()?, pins! { "a" => a, "b" => b })
}

/// Returns the CPU.
///
/// Executes "instruction" with memory operand "inM". When "writeM" is set, "outM" must be
/// stored at "addressM" on the next clock edge. "pc" is the address of the next instruction.
pub fn cpu() -> Result<Ic, WiringError> {
    use instruction::*;

    let mut ic = Ic::new("CPU");
    let in_m = ic.declare_input("inM", WORD)?;
    let op = ic.declare_input("instruction", WORD)?;
    let reset = ic.declare_input("reset", 1)?;
    ic.declare_output("outM", WORD)?;
    ic.declare_output("writeM", 1)?;
    ic.declare_output("addressM", WORD - 1)?;
    ic.declare_output("pc", WORD - 1)?;

    let is_c = op[C].clone();
    let is_a = apply1(&mut ic, not()?, pins! { "in" => is_c })?;

    // A register
    let alu_out = ic.forward(WORD)?;
    let a_from_alu = both(&mut ic, &is_c, &op[DEST_A])?;
    let a_in = apply(
        &mut ic,
        mux16()?,
        pins! { "a" => op, "b" => alu_out.bus(), "sel" => a_from_alu },
    )?;
    let load_a = apply1(&mut ic, or()?, pins! { "a" => is_a, "b" => a_from_alu })?;
    let a = apply(&mut ic, register()?, pins! { "in" => a_in, "load" => load_a })?;

    // D register
    let load_d = both(&mut ic, &is_c, &op[DEST_D])?;
    let d = apply(
        &mut ic,
        register()?,
        pins! { "in" => alu_out.bus(), "load" => load_d },
    )?;

    // ALU
    let use_m = both(&mut ic, &is_c, &op[A])?;
    let y = apply(&mut ic, mux16()?, pins! { "a" => a, "b" => in_m, "sel" => use_m })?;
    let alu = ic.call(
        super::alu()?,
        pins! {
            "x" => d,
            "y" => y,
            "zx" => op[COMP[0]],
            "nx" => op[COMP[1]],
            "zy" => op[COMP[2]],
            "ny" => op[COMP[3]],
            "f" => op[COMP[4]],
            "no" => op[COMP[5]],
        },
    )?;
    let out = ic.pin(alu, "out")?;
    let zr = ic.pin(alu, "zr")?.swap_remove(0);
    let ng = ic.pin(alu, "ng")?.swap_remove(0);
    ic.resolve(alu_out, &out)?;

    // Jump
    let zero_or_negative = apply1(&mut ic, or()?, pins! { "a" => zr, "b" => ng })?;
    let positive = apply1(&mut ic, not()?, pins! { "in" => zero_or_negative })?;
    let jlt = both(&mut ic, &op[JLT], &ng)?;
    let jeq = both(&mut ic, &op[JEQ], &zr)?;
    let jgt = both(&mut ic, &op[JGT], &positive)?;
    let jle = apply1(&mut ic, or()?, pins! { "a" => jlt, "b" => jeq })?;
    let jump = apply1(&mut ic, or()?, pins! { "a" => jle, "b" => jgt })?;
    let load_pc = both(&mut ic, &is_c, &jump)?;
    let on = ic.constant(true);
    let pc = apply(
        &mut ic,
        pc()?,
        pins! { "in" => a, "load" => load_pc, "inc" => on, "reset" => reset },
    )?;

    let write_m = both(&mut ic, &is_c, &op[DEST_M])?;
    ic.output("outM", out)?;
    ic.output("writeM", write_m)?;
    ic.output("addressM", &a[..WORD - 1])?;
    ic.output("pc", &pc[..WORD - 1])?;
    Ok(ic)
}
