//! simt-emu: cycle-accurate emulator for a 16-bit SIMT core

use std::env;

use anyhow::{anyhow, bail, Context, Result};
use env_logger::Env;

use simt_emu::config::Config;
use simt_emu::interpreter::engine::LaunchConfig;
use simt_emu::interpreter::test_runner::{TestResult, TestRunner};
use simt_emu::interpreter::timing::MemoryConfig;
use simt_emu::kernels::{
    matadd_program, matadd_reference, matmul_program, matmul_reference, MataddLayout, MatmulLayout,
};

const USAGE: &str = "\
Usage:
  simt-emu run <program> [--data FILE[@BASE]] [--threads N] [--block-dim N] [--read START:LEN]
  simt-emu disasm <program>
  simt-emu demo <matadd|matmul> [--size N]
  simt-emu sample-config

Programs ending in .bin are little-endian 16-bit words; other files hold one
binary (0b...) or hex (0x...) word per line.";

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };
    let rest = &args[1..];

    match command.as_str() {
        "run" => run(rest),
        "disasm" => disasm(rest),
        "demo" => demo(rest),
        "sample-config" => {
            print!("{}", Config::sample_config());
            if let Some(path) = Config::user_config_path() {
                eprintln!("# user config location: {}", path.display());
            }
            Ok(())
        }
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("unknown command '{}'\n\n{}", other, USAGE),
    }
}

/// Options shared by `run` and `demo`.
#[derive(Debug, Default)]
struct Options {
    positional: Vec<String>,
    data: Vec<(String, usize)>,
    threads: Option<u32>,
    block_dim: Option<u32>,
    read: Option<(usize, usize)>,
    size: Option<u8>,
}

fn parse_options(args: &[String]) -> Result<Options> {
    let mut opts = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{} needs a value", name))
        };
        match arg.as_str() {
            "--data" => {
                let spec = value("--data")?;
                let (path, base) = match spec.rsplit_once('@') {
                    Some((path, base)) => (path.to_string(), parse_number(base)?),
                    None => (spec, 0),
                };
                opts.data.push((path, base));
            }
            "--threads" => {
                let threads = parse_number(&value("--threads")?)?;
                opts.threads = Some(u32::try_from(threads).context("--threads is too large")?);
            }
            "--block-dim" => {
                let block_dim = parse_number(&value("--block-dim")?)?;
                opts.block_dim = Some(u32::try_from(block_dim).context("--block-dim is too large")?);
            }
            "--size" => {
                let size = parse_number(&value("--size")?)?;
                opts.size = Some(u8::try_from(size).context("--size is too large")?);
            }
            "--read" => {
                let spec = value("--read")?;
                let (start, len) = spec
                    .split_once(':')
                    .ok_or_else(|| anyhow!("--read expects START:LEN, got '{}'", spec))?;
                opts.read = Some((parse_number(start)?, parse_number(len)?));
            }
            flag if flag.starts_with("--") => bail!("unknown option '{}'", flag),
            _ => opts.positional.push(arg.clone()),
        }
    }

    Ok(opts)
}

fn parse_number(text: &str) -> Result<usize> {
    match text.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => text.parse(),
    }
    .with_context(|| format!("'{}' is not a number", text))
}

fn runner(config: &Config) -> Result<TestRunner> {
    let memory = config.memory_config().context("Invalid memory configuration")?;
    Ok(TestRunner::new(memory)?.with_max_cycles(config.max_cycles()))
}

fn run(args: &[String]) -> Result<()> {
    let opts = parse_options(args)?;
    let path = opts
        .positional
        .first()
        .ok_or_else(|| anyhow!("run needs a program file\n\n{}", USAGE))?;

    let config = Config::get();
    let mut runner = runner(config)?;
    runner.load_program_file(path)?;
    for (data, base) in &opts.data {
        runner.load_data_file(*base, data)?;
    }

    let block_dim = opts.block_dim.unwrap_or_else(|| config.block_dim());
    let threads = opts.threads.unwrap_or(block_dim);
    let launch = LaunchConfig::for_threads(threads, block_dim);

    println!("Loading: {} ({} instructions)", path, runner.program().len());
    println!("Launch: {} threads in {} blocks of {}", launch.threads, launch.blocks, launch.block_dim);
    println!();

    let result = runner.run(launch)?;
    print_result(&result);

    println!();
    for (channel, stats) in runner.memory().channel_stats().iter().enumerate() {
        println!(
            "Channel {}:     {} admitted, {} busy cycles, {} contended",
            channel, stats.admitted, stats.busy_cycles, stats.contention_count
        );
    }

    if let Some((start, len)) = opts.read {
        println!();
        print_memory(&runner, start, len)?;
    }

    Ok(())
}

fn disasm(args: &[String]) -> Result<()> {
    let path = args
        .first()
        .ok_or_else(|| anyhow!("disasm needs a program file\n\n{}", USAGE))?;
    let mut runner = TestRunner::new(MemoryConfig::data_memory())?;
    runner.load_program_file(path)?;
    print!("{}", runner.program().disassemble());
    Ok(())
}

fn demo(args: &[String]) -> Result<()> {
    let opts = parse_options(args)?;
    let kernel = opts.positional.first().map(String::as_str).unwrap_or("matadd");
    let config = Config::get();
    let block_dim = opts.block_dim.unwrap_or_else(|| config.block_dim());
    let mut runner = runner(config)?;
    let mask = runner.memory().config().word_mask();

    let (expected, base_c, threads) = match kernel {
        "matadd" => {
            let size = opts.size.unwrap_or(4);
            let layout = MataddLayout::packed(size, size)?;
            check_fits(layout.end(), &runner)?;
            let count = layout.threads() as usize;
            let a: Vec<u32> = (0..count as u32).collect();
            let b: Vec<u32> = (0..count as u32).map(|v| 2 * v + 1).collect();
            runner.write_memory(layout.base_a as usize, &a)?;
            runner.write_memory(layout.base_b as usize, &b)?;
            runner.load_program(matadd_program(&layout));
            (matadd_reference(&a, &b), layout.base_c, layout.threads())
        }
        "matmul" => {
            let size = opts.size.unwrap_or(3);
            let layout = MatmulLayout::packed(size, size, size)?;
            check_fits(layout.end(), &runner)?;
            let n = size as usize;
            let a: Vec<u32> = (0..(n * n) as u32).map(|v| v % 5 + 1).collect();
            let b: Vec<u32> = (0..(n * n) as u32).map(|v| (v * 3) % 7).collect();
            runner.write_memory(layout.base_a as usize, &a)?;
            runner.write_memory(layout.base_b as usize, &b)?;
            runner.load_program(matmul_program(&layout)?);
            (matmul_reference(&a, &b, n, n, n), layout.base_c, layout.threads())
        }
        other => bail!("unknown demo '{}' (expected matadd or matmul)", other),
    };

    let launch = LaunchConfig::for_threads(threads, block_dim);
    println!("Demo: {} ({} threads, block dim {})", kernel, launch.threads, launch.block_dim);
    println!();

    let result = runner.run(launch)?;
    print_result(&result);
    println!();
    print_memory(&runner, base_c as usize, expected.len())?;

    let expected: Vec<u32> = expected.iter().map(|v| v & mask).collect();
    runner.verify_output(base_c as usize, &expected)?;
    println!();
    println!("Output matches reference");
    Ok(())
}

fn check_fits(end: usize, runner: &TestRunner) -> Result<()> {
    let size = runner.memory().size();
    if end > size {
        bail!("matrices need {} words but memory has {}; raise addr_bits", end, size);
    }
    Ok(())
}

fn print_result(result: &TestResult) {
    let report = &result.report;
    println!("Cycles:        {}", result.cycles);
    println!("Threads:       {}", result.threads);
    println!("Instructions:  {}", report.instructions);
    println!("Stall cycles:  {}", report.stall_cycles);
    println!(
        "Memory:        {} reads, {} writes, {} contended ({} cycles)",
        report.memory.reads, report.memory.writes, report.memory.contention_count, report.memory.contention_cycles
    );

    if result.success() {
        println!("Status:        all threads retired");
    } else {
        println!("Status:        {} thread(s) faulted", result.faults.len());
        for fault in &result.faults {
            println!("  {}", fault);
        }
    }
}

fn print_memory(runner: &TestRunner, start: usize, len: usize) -> Result<()> {
    let words = runner.read_memory(start, len)?;
    println!("Memory [{}..{}]:", start, start.saturating_add(len));
    for (row, chunk) in words.chunks(8).enumerate() {
        let values: Vec<String> = chunk.iter().map(|w| format!("{:5}", w)).collect();
        println!("  {:4}: {}", start.saturating_add(row * 8), values.join(" "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_options() {
        let opts = parse_options(&args(&[
            "prog.txt", "--threads", "10", "--block-dim", "0x4", "--data", "a.txt@16", "--read", "0:8",
        ]))
        .unwrap();
        assert_eq!(opts.positional, vec!["prog.txt".to_string()]);
        assert_eq!(opts.threads, Some(10));
        assert_eq!(opts.block_dim, Some(4));
        assert_eq!(opts.data, vec![("a.txt".to_string(), 16)]);
        assert_eq!(opts.read, Some((0, 8)));
    }

    #[test]
    fn test_oversized_counts_are_rejected() {
        let err = parse_options(&args(&["--threads", "4294967296"])).unwrap_err();
        assert!(err.to_string().contains("--threads"));
        assert!(parse_options(&args(&["--block-dim", "4294967296"])).is_err());
        assert!(parse_options(&args(&["--size", "256"])).is_err());
        assert!(parse_options(&args(&["--threads"])).is_err());
    }

    #[test]
    fn test_demo_rejects_layout_past_memory() {
        let runner = TestRunner::new(MemoryConfig::data_memory()).unwrap();
        let layout = MataddLayout::packed(10, 10).unwrap();
        assert!(check_fits(layout.end(), &runner).is_err());
        assert!(check_fits(MataddLayout::packed(4, 4).unwrap().end(), &runner).is_ok());
    }
}
