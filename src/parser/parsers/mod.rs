// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

pub mod boot_services_app;
pub mod efi_variable;
pub mod event_tag;
pub mod gpt;
pub mod handoff_table;
pub mod no_action;
pub mod simple;

pub use boot_services_app::*;
pub use efi_variable::*;
pub use event_tag::*;
pub use gpt::*;
pub use handoff_table::*;
pub use no_action::*;
pub use simple::*;
