// The fetch-decode-execute loop and the sixteen opcodes' semantics. Every
// `u16` is a valid instruction, so decoding never fails; only bus/disk I/O
// can surface an error, and it propagates straight out to the caller
// (spec S7: host I/O failure is fatal, guest faults never exist).

use std::io::{Read, Write};

use crate::bus::Bus;
use crate::disk::DiskController;
use crate::instruction::{Instruction, Opcode};
use crate::memory::Memory;

pub struct Machine<R, W> {
    pub pc: u16,
    hi: u16,
    regs: [u16; 16],
    memory: Memory,
    disk0: DiskController,
    disk1: DiskController,
    bus: Bus<R, W>,
    halt: bool,
}

impl<R: Read, W: Write> Machine<R, W> {
    pub fn new(disk0: DiskController, disk1: DiskController, bus: Bus<R, W>) -> Self {
        Machine {
            pc: 0,
            hi: 0,
            regs: [0; 16],
            memory: Memory::new(),
            disk0,
            disk1,
            bus,
            halt: false,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halt
    }

    /// Read a register. Exposed alongside `set_reg`/`load_word` for the same
    /// reason the firmware's assembler pokes memory directly: driving or
    /// inspecting a `Machine` from outside the fetch/decode/execute loop is
    /// how this kind of core gets exercised and tested.
    pub fn reg(&self, i: usize) -> u16 {
        self.regs[i]
    }

    pub fn set_reg(&mut self, i: usize, value: u16) {
        self.regs[i] = value;
    }

    pub fn hi(&self) -> u16 {
        self.hi
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// The bytes written to the console so far. Exposed for driving and
    /// inspecting a `Machine` from outside the fetch/decode/execute loop,
    /// the same way `reg`/`load_word` are.
    pub fn output(&self) -> &W {
        self.bus.output()
    }

    /// Write a word directly into memory (RAM only -- the ROM overlay still
    /// discards it), bypassing the execute loop. Used to load a program
    /// before `run`, the same role `Emulator::load` plays in the teacher.
    pub fn load_word(&mut self, address: u16, word: u16) {
        self.memory.write(address, word);
    }

    pub fn disk_set_sector(&mut self, slot: u8, value: u16) {
        self.disk_mut(slot).set_sector(value);
    }

    pub fn disk_set_address(&mut self, slot: u8, value: u16) {
        self.disk_mut(slot).set_address(value);
    }

    pub fn disk_sector_count(&self, slot: u8) -> u16 {
        if slot == 0 { self.disk0.sector_count() } else { self.disk1.sector_count() }
    }

    /// Issue a command directly to a disk controller, bypassing the bus --
    /// the same shortcut `disk_set_sector`/`disk_set_address` take.
    pub fn disk_command(&mut self, slot: u8, command: u16) -> std::io::Result<()> {
        if slot == 0 {
            self.disk0.command(command, &mut self.memory)
        } else {
            self.disk1.command(command, &mut self.memory)
        }
    }

    fn disk_mut(&mut self, slot: u8) -> &mut DiskController {
        if slot == 0 { &mut self.disk0 } else { &mut self.disk1 }
    }

    /// Run until the halt flag is observed at the top of a cycle.
    pub fn run(&mut self) -> std::io::Result<()> {
        while !self.halt {
            self.step()?;
        }
        Ok(())
    }

    /// Fetch, increment `pc`, decode, execute: one instruction.
    pub fn step(&mut self) -> std::io::Result<()> {
        let word = self.memory.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        let instr = Instruction::decode(word);
        self.execute(instr)
    }

    fn execute(&mut self, instr: Instruction) -> std::io::Result<()> {
        let Instruction { op, dst, src1, src0 } = instr;
        match op {
            Opcode::Jump => {
                let guard = self.regs[src1];
                let target = self.regs[src0];
                if guard != 0 {
                    self.regs[dst] = self.pc;
                    self.pc = target;
                }
            }
            Opcode::ReadHi => {
                self.regs[dst] = self.hi;
            }
            Opcode::Set => {
                self.regs[dst] = ((src1 as u16) << 4) | (src0 as u16);
            }
            Opcode::Load => {
                let addr = self.regs[src0];
                self.regs[dst] = self.memory.read(addr);
            }
            Opcode::Store => {
                let addr = self.regs[src0];
                let value = self.regs[src1];
                self.memory.write(addr, value);
            }
            Opcode::Add => {
                let a = self.regs[src0] as u32;
                let b = self.regs[src1] as u32;
                let c = a + b;
                self.regs[dst] = c as u16;
                self.hi = (c >> 16) as u16;
            }
            Opcode::Sub => {
                let a = self.regs[src0];
                let b = self.regs[src1];
                self.regs[dst] = a.wrapping_sub(b);
                self.hi = if a < b { 0xFFFF } else { 0 };
            }
            Opcode::Mul => {
                let a = self.regs[src0] as u32;
                let b = self.regs[src1] as u32;
                let c = a * b;
                self.regs[dst] = c as u16;
                self.hi = (c >> 16) as u16;
            }
            Opcode::Div => {
                let a = self.regs[src0];
                let b = self.regs[src1];
                if b == 0 {
                    self.regs[dst] = 0xFFFF;
                    self.hi = 0xFFFF;
                } else {
                    self.regs[dst] = a / b;
                    self.hi = 0;
                }
            }
            Opcode::Shl => {
                let a = self.regs[src0];
                self.regs[dst] = a << (src1 as u32);
            }
            Opcode::Shr => {
                let a = self.regs[src0];
                self.regs[dst] = a >> (src1 as u32);
            }
            Opcode::And => {
                self.regs[dst] = self.regs[src0] & self.regs[src1];
            }
            Opcode::Or => {
                self.regs[dst] = self.regs[src0] | self.regs[src1];
            }
            Opcode::Not => {
                self.regs[dst] = !self.regs[src0];
            }
            Opcode::BusRead => {
                let addr = self.regs[src0];
                self.regs[dst] = self.bus.read(addr, &self.disk0, &self.disk1)?;
            }
            Opcode::BusWrite => {
                let addr = self.regs[src0];
                let value = self.regs[src1];
                let halt = self.bus.write(addr, value, &mut self.disk0, &mut self.disk1, &mut self.memory)?;
                if halt {
                    self.halt = true;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Bus;
    use std::io::Cursor;

    fn machine(input: &str) -> Machine<Cursor<Vec<u8>>, Vec<u8>> {
        let bus = Bus::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        Machine::new(DiskController::absent(), DiskController::absent(), bus)
    }

    #[test]
    fn set_is_assignment_not_or() {
        let mut m = machine("");
        m.set_reg(0, 0xFFFF);
        m.load_word(40, 0x20AB); // set R0, 0xAB
        m.pc = 40;
        m.step().unwrap();
        assert_eq!(m.reg(0), 0x00AB);
    }

    #[test]
    fn add_reports_carry_in_hi() {
        let mut m = machine("");
        m.set_reg(0, 0xFFFF);
        m.set_reg(1, 0x0002);
        m.load_word(40, 0x5201); // add R2, R0, R1 -> dst=2,src1=0,src0=1
        m.pc = 40;
        m.step().unwrap();
        assert_eq!(m.reg(2), 0x0001);
        assert_eq!(m.hi(), 1);
    }

    #[test]
    fn divide_by_zero_yields_tombstone() {
        let mut m = machine("");
        m.set_reg(0, 5);
        m.set_reg(1, 0);
        m.load_word(40, 0x8210); // div R2, R1, R0 -> dst=2,src1=1,src0=0
        m.load_word(41, 0x1300); // read-hi R3
        m.pc = 40;
        m.step().unwrap();
        m.step().unwrap();
        assert_eq!(m.reg(2), 0xFFFF);
        assert_eq!(m.reg(3), 0xFFFF);
    }

    #[test]
    fn jump_link_is_the_post_increment_pc() {
        let mut m = machine("");
        m.set_reg(1, 1); // guard
        m.set_reg(0, 0x30); // target
        m.load_word(0x28, 0x0210); // jump R2, R1, R0 -> dst=2,src1=1,src0=0
        m.pc = 0x28;
        m.step().unwrap();
        assert_eq!(m.reg(2), 0x29);
        assert_eq!(m.pc, 0x30);
    }

    #[test]
    fn jump_not_taken_leaves_dst_and_pc_alone() {
        let mut m = machine("");
        m.set_reg(1, 0); // guard false
        m.set_reg(2, 0xBEEF);
        m.load_word(40, 0x0210);
        m.pc = 40;
        m.step().unwrap();
        assert_eq!(m.reg(2), 0xBEEF);
        assert_eq!(m.pc, 41);
    }

    #[test]
    fn store_then_load_round_trips_in_ram() {
        let mut m = machine("");
        m.set_reg(0, 0xABCD);
        m.set_reg(1, 100);
        m.load_word(40, 0x4001); // store [R1], R0 -> src1=0,src0=1
        m.load_word(41, 0x3201); // load R2, [R1] -> dst=2,src0=1
        m.pc = 40;
        m.step().unwrap();
        m.step().unwrap();
        assert_eq!(m.reg(2), 0xABCD);
    }

    #[test]
    fn store_to_rom_is_discarded() {
        let mut m = machine("");
        m.set_reg(0, 0x00AB);
        m.set_reg(1, 0);
        m.load_word(40, 0x4001); // store [R1], R0
        m.load_word(41, 0x3201); // load R2, [R1]
        m.pc = 40;
        m.step().unwrap();
        m.step().unwrap();
        assert_eq!(m.reg(2), crate::firmware::FIRMWARE[0]);
        assert_ne!(m.reg(2), 0x00AB);
    }

    #[test]
    fn pc_wraps_modulo_2_16() {
        let mut m = machine("");
        m.pc = 0xFFFF;
        m.load_word(0xFFFF, 0x1000); // read-hi R0 (op/dst/src1/src0 all effectively 0 otherwise)
        m.step().unwrap();
        assert_eq!(m.pc, 0);
    }

    #[test]
    fn bus_write_to_halt_port_raises_halt_flag() {
        let mut m = machine("");
        m.set_reg(0, 7); // bus addr 0x7
        m.set_reg(1, 1); // non-zero
        m.load_word(40, 0xF010); // bus-write [R0], R1 -> src1=1,src0=0
        m.pc = 40;
        assert!(!m.is_halted());
        m.step().unwrap();
        assert!(m.is_halted());
    }

    #[test]
    fn echoes_one_byte_from_console_to_console() {
        let mut m = machine("A");
        m.set_reg(1, 0); // bus addr 0
        m.load_word(40, 0xE001); // bus-read R0, [R1] -> dst=0,src0=1
        m.load_word(41, 0xF001); // bus-write [R1], R0 -> src1=0,src0=1
        m.pc = 40;
        m.step().unwrap();
        m.step().unwrap();
        assert_eq!(m.reg(0), b'A' as u16);
    }

    #[test]
    fn shift_right_is_logical() {
        let mut m = machine("");
        m.set_reg(0, 0x8000);
        m.load_word(40, 0xA1F0); // shr R1, 15, R0 -> dst=1,src1=0xF... encode: op=A,dst=1,src1=F,src0=0
        m.pc = 40;
        m.step().unwrap();
        assert_eq!(m.reg(1), 1);
    }
}
