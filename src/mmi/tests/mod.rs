//! Shared fixtures for MMI format tests

use crate::models::{ConceptMention, Extras};
use crate::target_cuis::TargetCuiIndex;


pub const CHEST_PAIN: &str = r#"0000.tx|MMI|2.30|Chest Pain|C0008031|[sosy]|"Pain, Chest"-text-0-"Pain, chest"--0|text|0/11|C23.888.592.612.233"#;

pub const ACRONYM: &str = "23074487|AA|FY|fiscal years|1|2|3|12|9362:2";

/// Three triggers of one concept, the middle one with a part of speech
pub const RISK_OF: &str = r#"0001.tx|MMI|3.49|Risk|C0035647|[idcn]|"risk of"-text-0-"risk of"--0,"risk of"-text-0-"Risk of"-noun-0,"risk of"-text-20-"risk  of"--0|text|0/7;30/7;[50/8],[90/8]|"#;

pub fn parse_all(text: &str, file_name: &str, targets: &TargetCuiIndex) -> Vec<ConceptMention> {
    super::parse_mmi(text, file_name, targets, &Extras::new()).collect()
}
