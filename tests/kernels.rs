//! End-to-end kernel runs through the test harness.

use simt_emu::interpreter::engine::LaunchConfig;
use simt_emu::interpreter::test_runner::TestRunner;
use simt_emu::interpreter::timing::{ChannelMapping, MemoryConfig};
use simt_emu::kernels::{
    matadd_program, matadd_reference, matmul_program, matmul_reference, MataddLayout, MatmulLayout,
};

fn matadd_runner(config: MemoryConfig, layout: &MataddLayout) -> (TestRunner, Vec<u32>) {
    let count = layout.threads() as usize;
    let a: Vec<u32> = (0..count as u32).collect();
    let b: Vec<u32> = (0..count as u32).map(|v| 100 - v).collect();

    let mut runner = TestRunner::new(config).unwrap();
    runner.write_memory(layout.base_a as usize, &a).unwrap();
    runner.write_memory(layout.base_b as usize, &b).unwrap();
    runner.load_program(matadd_program(layout));
    (runner, matadd_reference(&a, &b))
}

#[test]
fn matadd_4x4() {
    let layout = MataddLayout::packed(4, 4).unwrap();
    let (mut runner, expected) = matadd_runner(MemoryConfig::data_memory(), &layout);

    let result = runner.run(LaunchConfig::grid(4, 4)).unwrap();
    assert!(result.success());
    assert_eq!(result.threads, 16);
    assert!(expected.iter().all(|&v| v == 100));
    runner.verify_output(layout.base_c as usize, &expected).unwrap();

    // Inputs untouched
    runner.verify_output(0, &(0..16).collect::<Vec<_>>()).unwrap();
}

#[test]
fn matadd_10x10_needs_wider_addresses() {
    let layout = MataddLayout::packed(10, 10).unwrap();
    assert_eq!(layout.end(), 300);

    let (mut runner, expected) = matadd_runner(MemoryConfig::new(10, 8, 4), &layout);
    assert!(runner.run(LaunchConfig::for_threads(layout.threads(), 16)).unwrap().success());
    runner.verify_output(layout.base_c as usize, &expected).unwrap();
}

#[test]
fn matadd_result_independent_of_launch_shape() {
    let layout = MataddLayout::packed(4, 4).unwrap();
    for block_dim in [1, 3, 4, 16, 32] {
        let (mut runner, expected) = matadd_runner(MemoryConfig::data_memory(), &layout);
        let launch = LaunchConfig::for_threads(layout.threads(), block_dim);
        assert!(runner.run(launch).unwrap().success());
        runner.verify_output(layout.base_c as usize, &expected).unwrap();
    }
}

#[test]
fn matadd_result_independent_of_memory_timing() {
    let layout = MataddLayout::packed(4, 4).unwrap();
    let configs = [
        MemoryConfig::data_memory(),
        MemoryConfig::data_memory().with_latency(5),
        MemoryConfig::data_memory().with_depth(3),
        MemoryConfig::data_memory().with_mapping(ChannelMapping::Partitioned),
        MemoryConfig::new(8, 8, 1),
    ];
    for config in configs {
        let (mut runner, expected) = matadd_runner(config, &layout);
        assert!(runner.run(LaunchConfig::grid(4, 4)).unwrap().success());
        runner.verify_output(layout.base_c as usize, &expected).unwrap();
    }
}

#[test]
fn more_channels_means_less_contention() {
    let layout = MataddLayout::packed(4, 4).unwrap();

    let (mut one, _) = matadd_runner(MemoryConfig::new(8, 8, 1), &layout);
    let (mut four, _) = matadd_runner(MemoryConfig::new(8, 8, 4), &layout);
    let one = one.run(LaunchConfig::grid(4, 4)).unwrap();
    let four = four.run(LaunchConfig::grid(4, 4)).unwrap();

    assert!(one.cycles > four.cycles);
    assert!(one.report.stall_cycles > four.report.stall_cycles);
    assert!(one.report.memory.contention_count > four.report.memory.contention_count);
    // Same work either way
    assert_eq!(one.report.instructions, four.report.instructions);
    assert_eq!(one.report.memory.reads, 32);
    assert_eq!(one.report.memory.writes, 16);
}

#[test]
fn runs_are_deterministic() {
    let layout = MataddLayout::packed(4, 4).unwrap();
    let (mut first, _) = matadd_runner(MemoryConfig::data_memory(), &layout);
    let (mut second, _) = matadd_runner(MemoryConfig::data_memory(), &layout);
    let a = first.run(LaunchConfig::grid(2, 8)).unwrap();
    let b = second.run(LaunchConfig::grid(2, 8)).unwrap();
    assert_eq!(a.report, b.report);
    assert_eq!(a.thread_stats, b.thread_stats);
}

fn run_matmul(rows: u8, cols: u8, n: u8, config: MemoryConfig, block_dim: u32) {
    let layout = MatmulLayout::packed(rows, cols, n).unwrap();
    let (r, c, k) = (rows as usize, cols as usize, n as usize);
    let a: Vec<u32> = (0..(r * k) as u32).map(|v| v % 7 + 1).collect();
    let b: Vec<u32> = (0..(k * c) as u32).map(|v| (v * 5) % 11).collect();

    let mut runner = TestRunner::new(config).unwrap();
    runner.write_memory(layout.base_a as usize, &a).unwrap();
    runner.write_memory(layout.base_b as usize, &b).unwrap();
    runner.load_program(matmul_program(&layout).unwrap());

    let result = runner
        .run(LaunchConfig::for_threads(layout.threads(), block_dim))
        .unwrap();
    assert!(result.success(), "faults: {:?}", result.faults);

    let mask = config.word_mask();
    let expected: Vec<u32> = matmul_reference(&a, &b, r, c, k)
        .into_iter()
        .map(|v| v & mask)
        .collect();
    runner.verify_output(layout.base_c as usize, &expected).unwrap();
}

#[test]
fn matmul_3x3() {
    run_matmul(3, 3, 3, MemoryConfig::data_memory(), 4);
}

#[test]
fn matmul_4x4_wide_words() {
    run_matmul(4, 4, 4, MemoryConfig::new(8, 16, 4), 4);
}

#[test]
fn matmul_4x4_truncates_to_word_width() {
    run_matmul(4, 4, 4, MemoryConfig::data_memory().with_latency(2), 8);
}

#[test]
fn matmul_non_square() {
    run_matmul(2, 5, 3, MemoryConfig::new(8, 16, 2).with_depth(2), 3);
}
