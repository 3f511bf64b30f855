//! A harness driving the synthesized [computer].
use crate::circuits::{computer, Devices, KEYBOARD, SCREEN};
use crate::{synthesize_ic, Evaluator, SimConfig, SimError};
use std::path::Path;

/// The computer, synthesized and ready to run a program.
///
/// # Example
/// ```
/// # use nandsim::{machine::Computer, SimConfig};
/// let mut computer = Computer::new(&SimConfig::default()).unwrap();
/// // @7, D=A, @0, M=D
/// computer.load_rom(&[7, 0xec10, 0, 0xe308]).unwrap();
/// computer.run(4).unwrap();
/// assert_eq!(computer.peek(0), 7);
/// ```
pub struct Computer {
    devices: Devices,
    evaluator: Evaluator,
}

impl Computer {
    /// Builds and synthesizes the computer with an empty ROM.
    pub fn new(config: &SimConfig) -> Result<Self, SimError> {
        let devices = Devices::new()?;
        let ic = computer(&devices)?;
        let evaluator = synthesize_ic(&ic, config)?;
        clilog::info!(
            "Computer synthesized with {} live signals",
            evaluator.len()
        );
        Ok(Computer { devices, evaluator })
    }

    /// Returns the storage of the computer.
    pub fn devices(&self) -> &Devices {
        &self.devices
    }

    /// Replaces the program, the rest of the ROM is zeroed.
    pub fn load_rom(&mut self, program: &[u16]) -> Result<(), SimError> {
        if program.len() > self.devices.rom.len() {
            return Err(SimError::Shape(format!(
                "program of {} words doesn't fit in a ROM of {} words",
                program.len(),
                self.devices.rom.len()
            )));
        }
        self.devices
            .rom
            .load(program.iter().map(|word| *word as u64));
        self.evaluator.invalidate();
        Ok(())
    }

    /// Loads a program stored as raw big endian 16 bit words.
    pub fn load_rom_bytes(&mut self, bytes: &[u8]) -> Result<(), SimError> {
        if bytes.len() % 2 != 0 {
            return Err(SimError::Shape(format!(
                "ROM image of {} bytes is not made of 16 bit words",
                bytes.len()
            )));
        }
        let program: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|word| u16::from_be_bytes([word[0], word[1]]))
            .collect();
        self.load_rom(&program)
    }

    /// Loads a ROM image file, see [load_rom_bytes](Computer::load_rom_bytes).
    pub fn load_rom_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SimError> {
        let bytes = std::fs::read(path)?;
        self.load_rom_bytes(&bytes)
    }

    /// Returns the word at `address` of the data memory map.
    ///
    /// Addresses from [KEYBOARD] up read the keyboard.
    pub fn peek(&self, address: usize) -> u16 {
        let word = if address < SCREEN {
            self.devices.ram.read(address)
        } else if address < KEYBOARD {
            self.devices.screen.read(address - SCREEN)
        } else {
            self.devices.keyboard.get()
        };
        word as u16
    }

    /// Stores `value` at `address` of the data memory map, the keyboard included.
    pub fn poke(&mut self, address: usize, value: u16) {
        if address < SCREEN {
            self.devices.ram.write(address, value as u64);
        } else if address < KEYBOARD {
            self.devices.screen.write(address - SCREEN, value as u64);
        } else {
            self.devices.keyboard.set(value as u64);
        }
        self.evaluator.invalidate();
    }

    /// Returns word `offset` of the screen, 16 pixels with the leftmost one in the lowest bit.
    pub fn peek_screen(&self, offset: usize) -> u16 {
        self.devices.screen.read(offset) as u16
    }

    /// Sets the code of the pressed key, 0 for none.
    pub fn set_key(&mut self, code: u16) {
        self.devices.keyboard.set(code as u64);
        self.evaluator.invalidate();
    }

    /// Runs a clock cycle with "reset" set, the program restarts from address 0.
    /// Data memory is left untouched.
    pub fn reset(&mut self) -> Result<(), SimError> {
        self.evaluator.set("reset", 1)?;
        self.evaluator.tick_tock(1)?;
        self.evaluator.set("reset", 0)
    }

    /// Runs `cycles` clock cycles, one instruction each.
    pub fn run(&mut self, cycles: usize) -> Result<(), SimError> {
        self.evaluator.tick_tock(cycles)
    }

    /// Returns the address of the next instruction.
    pub fn pc(&mut self) -> Result<u16, SimError> {
        self.evaluator.get_u16("pc")
    }

    /// Returns the number of propagation passes run so far.
    pub fn passes(&self) -> usize {
        self.evaluator.passes()
    }
}
