use crate::application::views::ExpenseView;
use crate::error::Result;
use std::io::Write;

/// Writes the final expense table as CSV.
pub struct ExpenseWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ExpenseWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().from_writer(sink),
        }
    }

    pub fn write_expenses(&mut self, expenses: &[ExpenseView]) -> Result<()> {
        self.writer
            .write_record(["id", "user_id", "amount", "status", "auto_approved"])?;
        for expense in expenses {
            self.writer.write_record([
                expense.id.to_string(),
                expense.user_id.to_string(),
                expense.amount.to_string(),
                expense.status.clone(),
                expense.auto_approved.to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_writes_header_and_rows() {
        let views = vec![ExpenseView {
            id: 2,
            user_id: 1,
            amount: dec!(150000),
            description: "Taxi".to_string(),
            receipt_url: None,
            status: "approved".to_string(),
            auto_approved: true,
        }];

        let mut buffer = Vec::new();
        ExpenseWriter::new(&mut buffer)
            .write_expenses(&views)
            .unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(
            output,
            "id,user_id,amount,status,auto_approved\n2,1,150000,approved,true\n"
        );
    }
}
