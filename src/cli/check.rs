//! Static checks over a listing

use super::CliError;
use crate::{Instruction, Template};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The instruction listing to check
    pub listing: String,
}

/// Result of a check operation
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    /// The listing parsed and uses only supported instructions
    Valid { template: String, instructions: usize },
    /// Offsets and instructions the compiler will reject
    Unsupported(Vec<(usize, Instruction)>),
}

/// Parse a listing and report unsupported constructs without replaying it
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let template: Template = options.listing.parse()?;

    let unsupported: Vec<(usize, Instruction)> = template
        .code()
        .iter()
        .enumerate()
        .filter(|(_, instruction)| matches!(instruction, Instruction::Unsupported { .. }))
        .map(|(offset, instruction)| (offset, instruction.clone()))
        .collect();

    if unsupported.is_empty() {
        Ok(CheckResult::Valid {
            template: template.name().to_string(),
            instructions: template.code().len(),
        })
    } else {
        Ok(CheckResult::Unsupported(unsupported))
    }
}
