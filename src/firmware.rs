// The 40-word boot ROM occupying addresses 0x00..0x27. Behavior, not bytes,
// is the contract (spec S4.6): probe disk0's sector count; if a disk is
// attached, chain-load its sector 0 directly into 40..295 (the word address
// the loaded program starts running at) and fall into 0x28; otherwise run an
// interactive hex assembler that folds typed nibbles into words at 0x28 and
// jumps there once a genuinely blank line (two newlines with nothing typed
// between them) is seen.
//
// Hand-assembled against the nibble encoding in `instruction.rs`
// (op | dst | src1 | src0, high nibble to low). Every register here is
// scratch; nothing about register contents at 0x28 is part of the contract
// (spec S4.6). All registers start at zero per the machine's reset state; the
// probe path relies on that directly (R8 is never written before the
// chain-load branch runs, so it still reads 0 there) and the blank-line flag
// (R9) relies on it too, rather than spending a word zeroing a register that
// already is.
//
// Every `Jump` below targets a register already holding the destination
// address rather than loading a fresh immediate per site, and discards its
// link into R10 (a pure scratch register whose value is never read back) --
// R10's write only happens after the jump's target operand has already been
// read into place, so reusing it as both "the register that currently holds
// a just-computed target" and "the link sink" never loses data.
//
// Register roles, fixed for the whole image:
//   R0   hex accumulator (assembler); reset to 0 after every stored word
//   R1   bus address scratch, reused across both branches
//   R2   nibble counter (assembler), 0..4
//   R3   last byte read from the console
//   R4   constant: CHAIN_LOAD (36) during the probe, then reassigned to
//        LOOP_TOP (14) once the assembler branch is entered
//   R5   scratch
//   R6   word-store cursor (assembler), starts at 0x28
//   R7   constant 0x0A ('\n')
//   R8   scratch in the assembler; reads as 0 (its reset value, untouched)
//        on the chain-load branch, which uses that directly as the disk
//        sector and command-code operand
//   R9   blank-line flag: 1 once a newline has been seen with no hex digit
//        typed since, so the *next* newline (an actual blank line) exits
//   R10  jump-link discard / transient single-use jump-target holder
//   R11  constant 0xF (nibble mask)
//   R12  constant 9 (hex letter-to-digit adjustment)
//   R13  constant 4 (nibbles per word)
//   R14  constant 0x28 (ENTRY): the assembler's exit target and the chain
//        load's destination address, never reassigned
//   R15  constant 1

use crate::instruction::Opcode;

const fn word(op: Opcode, dst: u16, src1: u16, src0: u16) -> u16 {
    ((op as u16) << 12) | (dst << 8) | (src1 << 4) | src0
}

const fn set(dst: u16, imm: u16) -> u16 {
    word(Opcode::Set, dst, (imm >> 4) & 0xF, imm & 0xF)
}

const ENTRY: u16 = 0x28;
const CHAIN_LOAD: u16 = 36;
const LOOP_TOP: u16 = 14;
const NIBBLE: u16 = 21;

pub const FIRMWARE: [u16; 40] = [
    // --- probe (0..8) ---
    set(4, CHAIN_LOAD),                    // 0:  R4  = chain-load entry (36)
    set(14, ENTRY),                         // 1:  R14 = 0x28, never reassigned
    set(15, 1),                             // 2:  R15 = 1
    set(11, 0xF),                           // 3:  R11 = nibble mask
    set(12, 9),                             // 4:  R12 = hex letter adjust
    set(13, 4),                             // 5:  R13 = nibbles per word
    set(1, 1),                              // 6:  R1  = bus addr 0x1
    word(Opcode::BusRead, 0, 0, 1),         // 7:  R0  = disk0.sector_count
    word(Opcode::Jump, 10, 0, 4),           // 8:  disk present -> R4 (36)
    // --- assembler init (9..13), reached only when no disk is attached;
    // R0 is already 0 here (it just read disk0.sector_count, which is the
    // reason this path was taken), so it needs no explicit reset ---
    set(2, 0),                              // 9:  nibble counter = 0
    set(6, ENTRY),                          // 10: write cursor = 0x28
    set(1, 0),                              // 11: bus addr 0x0 (console)
    set(7, 0x0A),                           // 12: R7 = '\n'
    set(4, LOOP_TOP),                       // 13: R4 = loop target (reassigned)
    // --- assembler loop (14..20) ---
    word(Opcode::BusRead, 3, 0, 1),          // 14: R3 = next input byte  [LOOP_TOP]
    word(Opcode::Sub, 5, 3, 7),               // 15: R5 = 0x0A - R3 (0 iff newline)
    set(10, NIBBLE),                           // 16: R10 = nibble-path target
    word(Opcode::Jump, 10, 5, 10),               // 17: not newline -> R10 (21)
    word(Opcode::Jump, 10, 9, 14),                 // 18: already blank -> R14 (exit)
    set(9, 1),                                      // 19: mark: saw a bare newline
    word(Opcode::Jump, 10, 15, 4),                    // 20: -> R4 (loop)
    // --- nibble decode and fold (21..35) ---
    set(9, 0),                                          // 21: clear blank flag [NIBBLE]
    word(Opcode::And, 5, 3, 11),                          // 22: R5 = R3 & 0xF
    word(Opcode::Shr, 8, 6, 3),                             // 23: R8 = R3 >> 6
    word(Opcode::Mul, 8, 12, 8),                              // 24: R8 = R8 * 9
    word(Opcode::Add, 5, 5, 8),                                 // 25: R5 = nibble value
    word(Opcode::Shl, 0, 4, 0),                                   // 26: R0 = R0 << 4
    word(Opcode::Or, 0, 0, 5),                                      // 27: R0 |= nibble
    word(Opcode::Add, 2, 2, 15),                                      // 28: counter += 1
    word(Opcode::Sub, 8, 2, 13),                                        // 29: R8 = 4 - counter
    word(Opcode::Jump, 10, 8, 4),                                         // 30: not 4 yet -> R4 (loop)
    word(Opcode::Store, 0, 0, 6),                                           // 31: [R6] = R0
    word(Opcode::Add, 6, 6, 15),                                              // 32: cursor += 1
    set(2, 0),                                                                  // 33: counter = 0
    word(Opcode::Sub, 0, 0, 0),                                                   // 34: R0 = 0 (reset)
    word(Opcode::Jump, 10, 15, 4),                                                  // 35: -> R4 (loop)
    // --- chain-load (36..39), entered only when a disk is attached; falls
    // through into 0x28 via ordinary PC increment after the last write. The
    // sector lands at word address R14 (= ENTRY = 0x28): the ROM overlay
    // would silently eat any words targeting addresses below 40, so loading
    // at 0 would drop the sector's first 40 words instead of filling the
    // 40..295 window the chain-loaded program falls through into. disk0's
    // sector register is already 0 (its reset value), so only the address
    // and the read command need setting. ---
    set(1, 3),                                                                       // 36: bus addr: disk0.address
    word(Opcode::BusWrite, 0, 14, 1),                                                  // 37: address = R14 (0x28)
    set(1, 1),                                                                           // 38: bus addr: disk0 command
    word(Opcode::BusWrite, 0, 8, 1),                                                       // 39: command 0 = read
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_exactly_forty_words() {
        assert_eq!(FIRMWARE.len(), 40);
    }

    #[test]
    fn every_word_decodes_without_panicking() {
        for &w in FIRMWARE.iter() {
            let _ = crate::instruction::Instruction::decode(w);
        }
    }

    #[test]
    fn chain_load_falls_through_to_entry_address() {
        // The last ROM word executes at 0x27 (39); PC increments to 0x28.
        assert_eq!(FIRMWARE.len() as u16, ENTRY);
    }
}
