//! 寄存器地址定义
//!
//! 控制器内存按 `DB 块号 + 字节偏移 (+ 位索引)` 寻址：
//! - 布尔量：`DB3.DBX25.0`（块 3，字节 25，位 0）
//! - 数值量：`DB3.DBD26`（块 3，从字节 26 开始的 REAL / INT）
//!
//! 所有地址都是编译期常量，只能通过 [`RegisterMap`](crate::RegisterMap) 获取，
//! 不接受来自外部请求的任意坐标。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 数据块编号
pub type BlockNumber = u16;

/// 单个布尔位地址（`DBX`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitAddress {
    /// 数据块编号
    pub block: BlockNumber,
    /// 字节偏移
    pub byte: u16,
    /// 位索引（0-7）
    pub bit: u8,
}

impl BitAddress {
    /// 创建位地址
    ///
    /// 位索引超出 0-7 会在编译期（const 上下文）或运行时 panic，
    /// 因为地址表是静态数据，越界只能是编码错误。
    pub const fn new(block: BlockNumber, byte: u16, bit: u8) -> Self {
        assert!(bit < 8, "bit index must be within 0..=7");
        Self { block, byte, bit }
    }

    /// 位掩码
    #[inline]
    pub const fn mask(&self) -> u8 {
        1 << self.bit
    }
}

impl fmt::Display for BitAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DB{}.DBX{}.{}", self.block, self.byte, self.bit)
    }
}

/// 多字节数值地址（`DBD` / `DBW`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordAddress {
    /// 数据块编号
    pub block: BlockNumber,
    /// 起始字节偏移
    pub byte: u16,
}

impl WordAddress {
    pub const fn new(block: BlockNumber, byte: u16) -> Self {
        Self { block, byte }
    }
}

impl fmt::Display for WordAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DB{}.DBD{}", self.block, self.byte)
    }
}

/// 任意寄存器地址
///
/// 用于日志、诊断等不关心具体类型的场景。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegisterAddress {
    Bit(BitAddress),
    Word(WordAddress),
}

impl RegisterAddress {
    pub fn block(&self) -> BlockNumber {
        match self {
            RegisterAddress::Bit(a) => a.block,
            RegisterAddress::Word(a) => a.block,
        }
    }

    pub fn byte(&self) -> u16 {
        match self {
            RegisterAddress::Bit(a) => a.byte,
            RegisterAddress::Word(a) => a.byte,
        }
    }

    /// 位索引；数值寄存器返回 `None`
    pub fn bit(&self) -> Option<u8> {
        match self {
            RegisterAddress::Bit(a) => Some(a.bit),
            RegisterAddress::Word(_) => None,
        }
    }
}

impl From<BitAddress> for RegisterAddress {
    fn from(addr: BitAddress) -> Self {
        RegisterAddress::Bit(addr)
    }
}

impl From<WordAddress> for RegisterAddress {
    fn from(addr: WordAddress) -> Self {
        RegisterAddress::Word(addr)
    }
}

impl fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterAddress::Bit(a) => a.fmt(f),
            RegisterAddress::Word(a) => a.fmt(f),
        }
    }
}
