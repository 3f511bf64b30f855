use anyhow::{bail, Context};
use nandsim::circuits::{computer, Devices};
use nandsim::machine::Computer;
use nandsim::{SimConfig, DEFAULT_MAX_PASSES};

fn config_from_env() -> anyhow::Result<SimConfig> {
    let max_passes = match std::env::var("NANDSIM_MAX_PASSES") {
        Ok(passes) => passes
            .parse()
            .with_context(|| format!("NANDSIM_MAX_PASSES is not a number: {}", passes))?,
        Err(_) => DEFAULT_MAX_PASSES,
    };
    Ok(SimConfig {
        max_passes,
        optimize: std::env::var_os("NANDSIM_NO_OPT").is_none(),
    })
}

fn main() -> anyhow::Result<()> {
    clilog::init_stderr_color_debug();
    let mut args = std::env::args().skip(1);
    let (rom, cycles) = match (args.next(), args.next()) {
        (Some(rom), cycles) => (rom, cycles),
        (None, _) => bail!("usage: nandsim ROM_FILE [CYCLES]"),
    };
    let cycles: usize = match cycles {
        Some(cycles) => cycles.parse().context("CYCLES is not a number")?,
        None => 10_000,
    };
    let config = config_from_env()?;

    let count = computer(&Devices::new()?)?.gate_count();
    for (kind, n) in &count {
        clilog::info!("{}: {}", kind, n);
    }

    let mut machine = Computer::new(&config)?;
    machine
        .load_rom_file(&rom)
        .with_context(|| format!("loading {}", rom))?;

    let t = std::time::Instant::now();
    machine.run(cycles)?;
    let d = t.elapsed().as_micros();

    println!(
        "pc: {}, passes: {}, duration: {}us, {:.2}us/cycle",
        machine.pc()?,
        machine.passes(),
        d,
        d as f64 / cycles.max(1) as f64
    );
    for address in 0..16 {
        println!("RAM[{}] = {}", address, machine.peek(address) as i16);
    }
    Ok(())
}
