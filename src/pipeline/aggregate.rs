//! Aggregation: flatten products from every image into one export table.
//!
//! The column order is fixed so exported files from different runs line up.
//! Every column is always present; a batch without products is a table with
//! headers only.

use crate::error::OffersError;
use crate::output::ExtractedProduct;
use std::io;

/// Columns of the [`ResultTable`], in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    SourceFile,
    BrandName,
    Brand,
    Product,
    PriceValue,
    PriceText,
    Conditions,
}

impl Column {
    /// Canonical column order.
    pub const ALL: [Column; 7] = [
        Column::SourceFile,
        Column::BrandName,
        Column::Brand,
        Column::Product,
        Column::PriceValue,
        Column::PriceText,
        Column::Conditions,
    ];

    /// Header written to exported files.
    pub fn header(self) -> &'static str {
        match self {
            Column::SourceFile => "arquivo",
            Column::BrandName => "marca_nome",
            Column::Brand => "marca",
            Column::Product => "produto",
            Column::PriceValue => "preco_brl",
            Column::PriceText => "preco_brl_texto",
            Column::Conditions => "condicoes",
        }
    }
}

/// One flattened product.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub source_file: String,
    pub brand_name: String,
    pub brand: String,
    pub product: String,
    pub price_value: Option<f64>,
    pub price_text: String,
    /// Conditions joined as `"kind: value; kind: value"`.
    pub conditions: String,
}

impl TableRow {
    fn from_product(product: &ExtractedProduct) -> Self {
        Self {
            source_file: product.source_file.clone(),
            brand_name: product.brand_name.clone(),
            brand: product.brand.clone(),
            product: product.product.clone(),
            price_value: product.price_value,
            price_text: product.price_text.clone(),
            conditions: product.conditions_text(),
        }
    }

    /// Text of one cell; an absent price is an empty cell.
    pub fn cell(&self, column: Column) -> String {
        match column {
            Column::SourceFile => self.source_file.clone(),
            Column::BrandName => self.brand_name.clone(),
            Column::Brand => self.brand.clone(),
            Column::Product => self.product.clone(),
            Column::PriceValue => self.price_value.map(|v| v.to_string()).unwrap_or_default(),
            Column::PriceText => self.price_text.clone(),
            Column::Conditions => self.conditions.clone(),
        }
    }
}

/// Read-only table of all products from one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    rows: Vec<TableRow>,
}

impl ResultTable {
    /// Build the table, keeping the order of `products`.
    pub fn from_products(products: &[ExtractedProduct]) -> Self {
        Self {
            rows: products.iter().map(TableRow::from_product).collect(),
        }
    }

    pub fn columns(&self) -> &'static [Column] {
        &Column::ALL
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns().iter().map(|c| c.header()).collect()
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the header row and every data row as UTF-8 CSV.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), OffersError> {
        let mut wtr = csv::Writer::from_writer(writer);

        wtr.write_record(self.headers())?;
        for row in &self.rows {
            wtr.write_record(self.columns().iter().map(|c| row.cell(*c)))?;
        }

        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Render the whole table as a CSV string.
    pub fn to_csv(&self) -> Result<String, OffersError> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf).map_err(|e| OffersError::Internal(format!("CSV is not UTF-8: {e}")))
    }
}
