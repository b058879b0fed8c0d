//! Schedule K-2 Part II, Section 1 line numbers.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IrsLine {
    pub line_number: u32,
    pub description: &'static str,
}

const fn line(line_number: u32, description: &'static str) -> IrsLine {
    IrsLine {
        line_number,
        description,
    }
}

pub const PART_II_LINES: &[IrsLine] = &[
    line(1, "Sales"),
    line(2, "Gross income from performance of services"),
    line(3, "Gross rental real estate income"),
    line(4, "Other gross rental income"),
    line(5, "Interest income"),
    line(6, "Ordinary dividends"),
    line(7, "Qualified dividends"),
    line(8, "Royalties"),
    line(9, "Net short-term capital gain"),
    line(10, "Net long-term capital gain"),
    line(11, "Collectibles (28%) gain"),
    line(12, "Unrecaptured section 1250 gain"),
    line(13, "Net section 1231 gain"),
    line(14, "Other income (loss)"),
    line(15, "Section 951(a)(1) inclusions"),
    line(16, "Section 951A(a) inclusions"),
    line(17, "Other foreign income"),
];

pub fn find_line(line_number: u32) -> Option<&'static IrsLine> {
    PART_II_LINES.iter().find(|l| l.line_number == line_number)
}

pub fn is_known_line(line_number: u32) -> bool {
    find_line(line_number).is_some()
}

/// Description for a line, `"Line N"` when the number is not in the table.
pub fn line_description(line_number: u32) -> String {
    match find_line(line_number) {
        Some(line) => line.description.to_string(),
        None => format!("Line {}", line_number),
    }
}

pub fn line_numbers() -> impl Iterator<Item = u32> {
    PART_II_LINES.iter().map(|l| l.line_number)
}
