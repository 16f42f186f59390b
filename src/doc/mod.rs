//! The structured document type shared by the index and the wire layer.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Ordered field containers.
pub mod document;
/// Scalar and composite values with a canonical cross-type order.
pub mod value;

pub use document::Document;
pub use value::Value;
