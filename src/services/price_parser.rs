//! 价格文本解析 - 业务能力层
//!
//! 把站点上五花八门的价格文本变成一个数字，永远不会失败。

/// 部分页面把价格和可访问性文本拼在一起，例如 `$36.90/kgprecio actual $36.90/kg`
const CURRENT_PRICE_MARKER: &str = "precio actual";

/// 解析价格文本
///
/// 1. 截掉 `precio actual` 及其后的内容
/// 2. 只保留数字、`.`、`,`
/// 3. 同时有 `.` 和 `,` 时把 `,` 当千位分隔符删掉；只有 `,` 时当小数点
/// 4. 长度超过 8 且前半段等于后半段时只保留前半段（价格被重复渲染）
/// 5. 解析失败或为空时返回 0.0
pub fn parse_price(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };

    let text = match raw.find(CURRENT_PRICE_MARKER) {
        Some(idx) => &raw[..idx],
        None => raw,
    };

    let mut cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    if cleaned.contains('.') && cleaned.contains(',') {
        cleaned = cleaned.replace(',', "");
    } else if cleaned.contains(',') {
        cleaned = cleaned.replace(',', ".");
    }

    let len = cleaned.len();
    if len > 8 && len % 2 == 0 && cleaned[..len / 2] == cleaned[len / 2..] {
        cleaned.truncate(len / 2);
    }

    match cleaned.parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => price,
        _ => 0.0,
    }
}
