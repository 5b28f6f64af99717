// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod audit;
pub mod cli;
pub mod controller;
pub mod csv_io;
pub mod db;
pub mod editor;
pub mod error;
pub mod forms;
pub mod models;
pub mod report;
pub mod settings;
pub mod shell;
pub mod store;
pub mod utils;
