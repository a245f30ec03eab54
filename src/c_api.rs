// src/c_api.rs
#![allow(clippy::not_unsafe_ptr_arg_deref)]

//! C ABI over a single process-wide engine.
//!
//! The C side owns the interrupt entry points: each assembly/C shim calls
//! the matching `reinjector_*` handler below, which is a no-op until
//! `reinjector_init` has run.

use crate::engine::Engine;
use crate::lock::EngineOnce;
use crate::mmio::{MmioPlatform, ReinjectorHardware};
use crate::{EngineConfig, ReinjectError};
use core::slice;

static ENGINE: EngineOnce<Engine<MmioPlatform>> = EngineOnce::new();

// ----------------- error/status helpers -----------------

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReinjectorStatus {
    Ok = 0,
    Err = -1,
    NullPointer = -2,
    NotInitialised = -3,
    AlreadyInitialised = -4,
    Discarded = -5,
    BufferTooSmall = -6,
}

#[inline]
fn status(s: ReinjectorStatus) -> i32 {
    s as i32
}

#[inline]
fn status_from_err(e: ReinjectError) -> i32 {
    match e {
        ReinjectError::BufferTooSmall { .. } => status(ReinjectorStatus::BufferTooSmall),
        ReinjectError::Truncated { .. } | ReinjectError::NotScp(_) => {
            status(ReinjectorStatus::Discarded)
        }
        _ => status(ReinjectorStatus::Err),
    }
}

#[inline]
fn engine() -> Option<&'static Engine<MmioPlatform>> {
    ENGINE.get()
}

// ----------------- lifecycle -----------------

/// Build the engine over the given hardware. Must be called once, before
/// any interrupt that reaches the handlers below is enabled.
#[unsafe(no_mangle)]
pub extern "C" fn reinjector_init(hw: *const ReinjectorHardware) -> i32 {
    if hw.is_null() {
        return status(ReinjectorStatus::NullPointer);
    }
    if ENGINE.is_completed() {
        return status(ReinjectorStatus::AlreadyInitialised);
    }
    let hw = unsafe { *hw };
    // SAFETY: the caller hands over register blocks and callbacks valid for
    // the rest of the program, as documented in the C header.
    let Some(platform) = (unsafe { MmioPlatform::new(hw) }) else {
        return status(ReinjectorStatus::NullPointer);
    };
    ENGINE.call_once(|| Engine::new(platform, EngineConfig::default()));
    status(ReinjectorStatus::Ok)
}

/// Configure the hardware and enable the engine's interrupts.
#[unsafe(no_mangle)]
pub extern "C" fn reinjector_start() -> i32 {
    match engine() {
        Some(e) => {
            e.start();
            status(ReinjectorStatus::Ok)
        }
        None => status(ReinjectorStatus::NotInitialised),
    }
}

/// Idle until the exit command arrives.
#[unsafe(no_mangle)]
pub extern "C" fn reinjector_run() -> i32 {
    match engine() {
        Some(e) => {
            e.run();
            status(ReinjectorStatus::Ok)
        }
        None => status(ReinjectorStatus::NotInitialised),
    }
}

/// 1 while running, 0 after exit or before init.
#[unsafe(no_mangle)]
pub extern "C" fn reinjector_is_running() -> i32 {
    engine().is_some_and(|e| e.is_running()) as i32
}

// ----------------- interrupt entries -----------------

#[unsafe(no_mangle)]
pub extern "C" fn reinjector_fiq_dropped_packet() {
    if let Some(e) = engine() {
        e.on_dropped_packet();
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn reinjector_irq_timer() {
    if let Some(e) = engine() {
        e.on_timer_tick();
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn reinjector_irq_tx_ready() {
    if let Some(e) = engine() {
        e.on_transmitter_ready();
    }
}

// ----------------- commands -----------------

/// Handle one SDP frame of `len` bytes held in `buf` (capacity `cap`) and
/// write the reply back into `buf`, storing its length in `*out_len`.
///
/// Returns `Discarded` (and writes nothing) for frames that get no reply.
#[unsafe(no_mangle)]
pub extern "C" fn reinjector_handle_sdp(
    buf: *mut u8,
    len: usize,
    cap: usize,
    out_len: *mut usize,
) -> i32 {
    if buf.is_null() || out_len.is_null() {
        return status(ReinjectorStatus::NullPointer);
    }
    if len > cap {
        return status(ReinjectorStatus::BufferTooSmall);
    }
    let Some(e) = engine() else {
        return status(ReinjectorStatus::NotInitialised);
    };

    let reply = {
        let request = unsafe { slice::from_raw_parts(buf as *const u8, len) };
        e.handle_frame(request)
    };
    let Some(reply) = reply else {
        return status(ReinjectorStatus::Discarded);
    };

    let out = unsafe { slice::from_raw_parts_mut(buf, cap) };
    match reply.write_to(out) {
        Ok(n) => {
            unsafe { *out_len = n };
            status(ReinjectorStatus::Ok)
        }
        Err(err) => status_from_err(err),
    }
}
