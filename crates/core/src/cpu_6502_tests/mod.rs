//! Tests for the MOS 6502 CPU implementation
//!
//! Tests are organized by concern:
//! - `tests_status`: status register encoding and flag instructions
//! - `tests_addressing`: effective address computation for all modes
//! - `tests_instructions`: instruction semantics (Z/N contract, compares)
//! - `tests_cycles`: cycle accounting across the whole opcode table
//! - `tests_scenarios`: concrete end-to-end instruction scenarios

mod tests_addressing;
mod tests_cycles;
mod tests_instructions;
mod tests_scenarios;
