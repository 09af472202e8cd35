//! End-to-end tests of the `qualisys` extension against a scripted QTM
//! server listening on the loopback interface.

pub mod fake_qtm;

#[cfg(test)]
mod extension;
