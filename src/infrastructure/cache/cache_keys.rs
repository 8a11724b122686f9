pub fn settlement_summary_key(group_id: &str) -> String {
    format!("settlement_summary:{}", group_id)
}
