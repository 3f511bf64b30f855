use super::*;
use crate::SimError;

pub const ROM_ADDRESS_WIDTH: usize = 15;
pub const RAM_ADDRESS_WIDTH: usize = 14;
pub const SCREEN_ADDRESS_WIDTH: usize = 13;
/// Base address of the screen memory map.
pub const SCREEN: usize = 1 << RAM_ADDRESS_WIDTH;
/// Address of the keyboard register.
pub const KEYBOARD: usize = SCREEN + (1 << SCREEN_ADDRESS_WIDTH);

/// Storage shared between the [computer] netlist and whoever drives it.
///
/// Cloning shares the storage, the evaluator sees writes made through any clone.
#[derive(Clone, Debug)]
pub struct Devices {
    pub rom: Memory,
    pub ram: Memory,
    pub screen: Memory,
    pub keyboard: Port,
}

impl Devices {
    pub fn new() -> Result<Self, SimError> {
        Ok(Devices {
            rom: Memory::new(ROM_ADDRESS_WIDTH, WORD)?,
            ram: Memory::new(RAM_ADDRESS_WIDTH, WORD)?,
            screen: Memory::new(SCREEN_ADDRESS_WIDTH, WORD)?,
            keyboard: Port::new(WORD),
        })
    }
}

/// Returns the data memory: RAM below [SCREEN], then the screen map and the keyboard
/// register at [KEYBOARD].
///
/// "out" is the word at "address". On the clock edge, "in" is stored at "address" if "load".
/// Addresses past [KEYBOARD] read the keyboard and stores to them are dropped.
pub fn memory(devices: &Devices) -> Result<Ic, WiringError> {
    let mut ic = Ic::new("Memory");
    let data = ic.declare_input("in", WORD)?;
    let load = ic.declare_input("load", 1)?;
    let address = ic.declare_input("address", ROM_ADDRESS_WIDTH)?;
    ic.declare_output("out", WORD)?;

    let sel = [
        address[SCREEN_ADDRESS_WIDTH].clone(),
        address[RAM_ADDRESS_WIDTH].clone(),
    ];
    let dmux = ic.call(dmux4way()?, pins! { "in" => load, "sel" => sel })?;
    let low = ic.pin(dmux, "a")?;
    let high = ic.pin(dmux, "b")?;
    let load_ram = apply(&mut ic, or()?, pins! { "a" => low, "b" => high })?;
    let load_screen = ic.pin(dmux, "c")?;

    let ram = apply(
        &mut ic,
        Component::Ram(devices.ram.clone()),
        pins! { "in" => data, "load" => load_ram, "address" => address[..RAM_ADDRESS_WIDTH] },
    )?;
    let screen = apply(
        &mut ic,
        Component::Ram(devices.screen.clone()),
        pins! {
            "in" => data,
            "load" => load_screen,
            "address" => address[..SCREEN_ADDRESS_WIDTH],
        },
    )?;
    let keyboard = ic.call(Component::Input(devices.keyboard.clone()), &[])?;
    let keyboard = ic.pin(keyboard, "out")?;
    let out = apply(
        &mut ic,
        mux4way16()?,
        pins! { "a" => ram, "b" => ram, "c" => screen, "d" => keyboard, "sel" => sel },
    )?;
    ic.output("out", out)?;
    Ok(ic)
}

/// Returns the computer: a [cpu] running the program in `devices.rom` on the [memory] of `devices`.
///
/// Its only output is "pc", which keeps the whole machine reachable. Setting "reset" for a
/// clock cycle restarts the program.
pub fn computer(devices: &Devices) -> Result<Ic, WiringError> {
    let mut ic = Ic::new("Computer");
    let reset = ic.declare_input("reset", 1)?;
    ic.declare_output("pc", ROM_ADDRESS_WIDTH)?;

    let pc = ic.forward(ROM_ADDRESS_WIDTH)?;
    let in_m = ic.forward(WORD)?;
    let instruction = apply(
        &mut ic,
        Component::Rom(devices.rom.clone()),
        pins! { "address" => pc.bus() },
    )?;
    let cpu = ic.call(
        cpu()?,
        pins! { "inM" => in_m.bus(), "instruction" => instruction, "reset" => reset },
    )?;
    let out_m = ic.pin(cpu, "outM")?;
    let write_m = ic.pin(cpu, "writeM")?;
    let address_m = ic.pin(cpu, "addressM")?;
    let data = apply(
        &mut ic,
        memory(devices)?,
        pins! { "in" => out_m, "load" => write_m, "address" => address_m },
    )?;
    ic.resolve(in_m, data)?;
    let next = ic.pin(cpu, "pc")?;
    ic.resolve(pc, &next)?;
    ic.output("pc", next)?;
    Ok(ic)
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use super::*;

    #[test]
    fn test_memory_map() {
        let devices = Devices::new().unwrap();
        devices.ram.write(5, 55);
        devices.ram.write(SCREEN - 1, 77);
        devices.screen.write(3, 33);
        devices.keyboard.set(75);

        let mut e = evaluator(memory(&devices));
        for (address, expected) in [(5, 55), (SCREEN - 1, 77), (SCREEN + 3, 33), (KEYBOARD, 75)] {
            e.set("address", address as u64).unwrap();
            assert_eq!(e.get("out").unwrap(), expected);
        }

        e.set("address", (SCREEN + 8) as u64).unwrap();
        e.set("in", 0xffff).unwrap();
        e.set("load", 1).unwrap();
        e.tick_tock(1).unwrap();
        assert_eq!(devices.screen.read(8), 0xffff);
        assert_eq!(devices.ram.read(8), 0);

        e.set("address", 8).unwrap();
        e.tick_tock(1).unwrap();
        assert_eq!(devices.ram.read(8), 0xffff);

        e.set("address", KEYBOARD as u64).unwrap();
        e.tick_tock(1).unwrap();
        assert_eq!(devices.keyboard.get(), 75);
    }

    #[test]
    fn test_gate_count() {
        let devices = Devices::new().unwrap();
        let count = computer(&devices).unwrap().gate_count();
        assert_eq!(count[&PrimitiveKind::Rom], 1);
        assert_eq!(count[&PrimitiveKind::Ram], 2);
        assert_eq!(count[&PrimitiveKind::Input], 1);
        // A, D and the program counter.
        assert_eq!(count[&PrimitiveKind::Dff], 3 * WORD);
    }
}
