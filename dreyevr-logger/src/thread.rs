// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

/// Get the kernel id of the calling thread
pub fn id() -> u32 {
    // Safety: gettid(2) says this never fails
    unsafe { libc::gettid() as u32 }
}
