// std on host/tests; no_std when the `std` feature is OFF

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
extern crate core;
#[cfg(feature = "std")]
extern crate std;

use crate::macros::ReprU32Enum;


// ---------- Allocator & panic handlers ----------
// For EMBEDDED builds (no_std + bare-metal target), provide the SARK heap + panic.
#[cfg(all(not(feature = "std"), target_os = "none"))]
mod embedded_alloc {
    use core::alloc::{GlobalAlloc, Layout};

    unsafe extern "C" {
        fn sark_alloc(count: u32, size: u32) -> *mut core::ffi::c_void;
        fn sark_free(ptr: *mut core::ffi::c_void);
    }

    pub struct SarkAlloc;

    unsafe impl GlobalAlloc for SarkAlloc {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            // SARK hands out word-aligned blocks
            if layout.align() > 4 {
                return core::ptr::null_mut();
            }
            unsafe { sark_alloc(1, layout.size() as u32) as *mut u8 }
        }
        unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
            unsafe { sark_free(ptr as *mut _) }
        }
    }

    #[global_allocator]
    static A: SarkAlloc = SarkAlloc;

    use core::panic::PanicInfo;

    #[panic_handler]
    fn panic(_info: &PanicInfo) -> ! {
        // Halt forever after that
        loop {}
    }
}

// For HOST builds (std is ON), the system allocator is used automatically.

// ---------- Portable core logic ----------
mod c_api;
pub mod capture;
pub mod command;
pub mod config;
pub mod drain;
pub mod engine;
pub mod filter;
mod lock;
pub mod macros;
pub mod mmio;
pub mod monitor;
pub mod packet;
pub mod platform;
pub mod queue;
#[cfg(feature = "std")]
pub mod sim;
pub mod stats;

pub use command::{CommandFrame, CommandMessage, CommandTransport, ReplyFrame, ReinjectionStatus};
pub use config::{EngineConfig, PacketType, SubCommand};
pub use engine::Engine;
pub use packet::DumpedPacket;
pub use platform::{InterruptSource, Platform};
pub use queue::PacketQueue;

/// Failures surfaced by the control plane. Interrupt paths never produce
/// these; they fold their failures into statistics instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReinjectError {
    /// Too short to carry even a reply header.
    Truncated { got: usize },
    /// Shorter than a full command message.
    LengthError { expected: usize, got: usize },
    /// SCP command other than the re-injection command.
    InvalidCommand(u16),
    /// Unknown re-injection sub-command.
    InvalidSubCommand(u32),
    ArgumentOutOfRange { value: u32, max: u32 },
    /// Message addressed to a non-zero SDP port.
    NotScp(u8),
    BufferTooSmall { needed: usize, got: usize },
}

impl ReinjectError {
    pub const fn to_result_code(&self) -> ResultCode {
        match self {
            ReinjectError::Truncated { .. } => ResultCode::Len,
            ReinjectError::LengthError { .. } => ResultCode::Len,
            ReinjectError::InvalidCommand(_) => ResultCode::Cmd,
            ReinjectError::InvalidSubCommand(_) => ResultCode::Arg,
            ReinjectError::ArgumentOutOfRange { .. } => ResultCode::Arg,
            ReinjectError::NotScp(_) => ResultCode::Cmd,
            ReinjectError::BufferTooSmall { .. } => ResultCode::Len,
        }
    }
}

impl core::fmt::Display for ReinjectError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReinjectError::Truncated { got } => write!(f, "message truncated ({got} bytes)"),
            ReinjectError::LengthError { expected, got } => {
                write!(f, "message too short: expected {expected} bytes, got {got}")
            }
            ReinjectError::InvalidCommand(cmd) => write!(f, "invalid command {cmd}"),
            ReinjectError::InvalidSubCommand(sub) => write!(f, "invalid sub-command {sub}"),
            ReinjectError::ArgumentOutOfRange { value, max } => {
                write!(f, "argument {value} out of range (max {max})")
            }
            ReinjectError::NotScp(port) => write!(f, "message for port {port} is not SCP"),
            ReinjectError::BufferTooSmall { needed, got } => {
                write!(f, "buffer too small: need {needed} bytes, got {got}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ReinjectError {}

/// SCP result codes carried in the `cmd_rc` field of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ResultCode {
    Ok = 0x80,
    Len = 0x81,
    Cmd = 0x83,
    Arg = 0x84,
}

impl ResultCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::Ok => "{OK}",
            ResultCode::Len => "{Length Error}",
            ResultCode::Cmd => "{Invalid Command}",
            ResultCode::Arg => "{Invalid Argument}",
        }
    }

    pub fn try_from_u16(x: u16) -> Option<Self> {
        match x {
            0x80 => Some(ResultCode::Ok),
            0x81 => Some(ResultCode::Len),
            0x83 => Some(ResultCode::Cmd),
            0x84 => Some(ResultCode::Arg),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u32 as u16
    }
}

pub type ReinjectResult<T> = Result<T, ReinjectError>;

pub fn try_enum_from_u32<E: ReprU32Enum>(x: u32) -> Option<E> {
    if x > E::MAX {
        return None;
    }

    // SAFETY: `E` is promised to be a fieldless #[repr(u32)] enum with
    // sequential discriminants from 0 (thus 4 bytes, Copy, every value <= MAX valid).
    let e = unsafe { (&x as *const u32 as *const E).read() };
    Some(e)
}
