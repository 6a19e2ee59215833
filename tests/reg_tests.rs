//! Register Access Layer Tests
//!
//! Bitfield helpers and the simulated register file.
//! Run with: cargo test --target x86_64-unknown-linux-gnu --no-default-features --features std --test reg_tests

use mcal::{Field, RegisterAccess, SimRegisters};

// =============================================================================
// Bitfield helpers
// =============================================================================

#[test]
fn test_set_and_clear_bits() {
    let mut regs = SimRegisters::<4>::new();
    regs.set_bits(0x04, 0b1010);
    regs.set_bits(0x04, 0b0001);
    assert_eq!(regs.peek(0x04), 0b1011);

    regs.clear_bits(0x04, 0b0010);
    assert_eq!(regs.peek(0x04), 0b1001);
    assert_eq!(regs.peek(0x00), 0);
}

#[test]
fn test_is_set_requires_every_bit() {
    let mut regs = SimRegisters::<1>::new();
    regs.poke(0, 0b0110);
    assert!(regs.is_set(0, 0b0110));
    assert!(regs.is_set(0, 0b0010));
    assert!(!regs.is_set(0, 0b0111));
}

#[test]
fn test_write_field_preserves_neighbours() {
    let mut regs = SimRegisters::<2>::new();
    regs.poke(0x04, 0xFFFF_FFFF);
    let field = Field::new(0x04, 8, 4);

    regs.write_field(field, 0x3);
    assert_eq!(regs.peek(0x04), 0xFFFF_F3FF);
    assert_eq!(regs.read_field(field), 0x3);
}

#[test]
fn test_write_field_truncates_to_width() {
    let mut regs = SimRegisters::<1>::new();
    let field = Field::new(0, 4, 2);
    regs.write_field(field, 0xFF);
    assert_eq!(regs.peek(0), 0b11_0000);
}

#[test]
fn test_single_bit_field() {
    let f = Field::bit(0x08, 31);
    assert_eq!(f.mask(), 0x8000_0000);
    assert_eq!(f.extract(0x8000_0000), 1);
}

// =============================================================================
// Simulation knobs
// =============================================================================

#[test]
fn test_self_clearing_bits_read_back_zero() {
    let mut regs = SimRegisters::<2>::new().self_clearing(0x04, 1 << 0);
    regs.write(0x04, 0b11);
    assert_eq!(regs.peek(0x04), 0b10);
}

#[test]
fn test_echo_mirrors_control_into_status() {
    let ctrl = Field::new(0x00, 0, 2);
    let status = Field::new(0x00, 2, 2);
    let mut regs = SimRegisters::<1>::new().echo(ctrl, status);

    regs.write_field(ctrl, 0b10);
    assert_eq!(regs.read_field(status), 0b10);
    assert_eq!(regs.peek(0), 0b1010);
}

#[test]
fn test_echo_across_registers() {
    let on = Field::bit(0x00, 24);
    let ready = Field::bit(0x04, 25);
    let mut regs = SimRegisters::<2>::new().echo(on, ready);

    regs.set_bits(0x00, 1 << 24);
    assert!(regs.is_set(0x04, 1 << 25));
    regs.clear_bits(0x00, 1 << 24);
    assert!(!regs.is_set(0x04, 1 << 25));
}

#[test]
#[should_panic(expected = "echo rules")]
fn test_ninth_echo_rule_panics() {
    let mut regs = SimRegisters::<1>::new();
    for bit in 0..9 {
        regs = regs.echo(Field::bit(0x00, bit), Field::bit(0x00, bit + 16));
    }
}

#[test]
fn test_flag_clear_keeps_flags_raised_meanwhile() {
    let mut regs = SimRegisters::<1>::new().write_zero_clears(0x00, 0b0111);
    regs.poke(0x00, 0b1001);
    // A second flag rises between the driver's decision and its write
    regs.poke(0x00, 0b1011);
    regs.clear_flags(0x00, 0b0001);
    assert_eq!(regs.peek(0x00), 0b1010);

    // Bits outside the write-zero mask ignore the written zeros
    regs.write(0x00, 0);
    assert_eq!(regs.peek(0x00), 0b1000);
}

#[test]
fn test_poke_is_not_a_write() {
    let mut regs = SimRegisters::<2>::new();
    regs.poke(0, 5);
    assert_eq!(regs.write_count(), 0);
    regs.modify(0, |r| r + 1);
    assert_eq!(regs.write_count(), 1);
    assert_eq!(regs.read(0), 6);
}

#[test]
fn test_wait_set_returns_when_bits_present() {
    let mut regs = SimRegisters::<1>::new();
    regs.poke(0, 0b100);
    regs.wait_set(0, 0b100);
    regs.wait_clear(0, 0b011);
}

#[test]
fn test_mutable_reference_is_a_backend() {
    fn bump<R: RegisterAccess>(mut regs: R) {
        regs.set_bits(0, 1);
    }

    let mut regs = SimRegisters::<1>::new();
    bump(&mut regs);
    assert_eq!(regs.peek(0), 1);
}

#[test]
fn test_snapshot_copies_every_word() {
    let mut regs = SimRegisters::<3>::new();
    regs.write(0x08, 7);
    assert_eq!(regs.snapshot(), [0, 0, 7]);
}
