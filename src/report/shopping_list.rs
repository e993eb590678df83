use std::io::BufWriter;

use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::{
    constants::{REPORT_LINES_PER_PAGE, SHOPPING_LIST_TITLE},
    database::schema::ShoppingListItem,
    error::{ApiError, Error},
};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const TITLE_FONT_SIZE: f32 = 24.0;
const LINE_FONT_SIZE: f32 = 14.0;
const LINE_SPACING_MM: f32 = 6.0;

/// One report line per aggregated ingredient: `{name} {amount} {unit}.`
pub fn layout_lines(items: &[ShoppingListItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            format!(
                "{} {} {}.",
                item.name, item.total_amount, item.measurement_unit
            )
        })
        .collect()
}

/// Splits the report body into pages of `REPORT_LINES_PER_PAGE` lines.
pub fn paginate(lines: &[String]) -> Vec<&[String]> {
    lines.chunks(REPORT_LINES_PER_PAGE).collect()
}

/// Renders the shopping list as an A4 PDF. Resource failures (font, document
/// serialization) are fatal and surface as server errors.
pub fn render_pdf(items: &[ShoppingListItem]) -> Result<Vec<u8>, Error> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        SHOPPING_LIST_TITLE,
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "ingredients",
    );

    let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(|e| {
        log::error!("Failed to load report font: {e}");
        ApiError::InternalServerError.new("Failed to load report font")
    })?;

    let lines = layout_lines(items);
    let pages = paginate(&lines);

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;

    layer.use_text(SHOPPING_LIST_TITLE, TITLE_FONT_SIZE, Mm(MARGIN_MM), Mm(y), &font);
    y -= 2.0 * LINE_SPACING_MM;

    for (index, page_lines) in pages.iter().enumerate() {
        if index > 0 {
            let (page, page_layer) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "ingredients");
            layer = doc.get_page(page).get_layer(page_layer);
            y = PAGE_HEIGHT_MM - MARGIN_MM;
        }

        for line in page_lines.iter() {
            layer.use_text(line, LINE_FONT_SIZE, Mm(MARGIN_MM), Mm(y), &font);
            y -= LINE_SPACING_MM;
        }
    }

    let mut buffer = BufWriter::new(Vec::new());
    doc.save(&mut buffer).map_err(|e| {
        log::error!("Failed to serialize shopping list document: {e}");
        ApiError::InternalServerError.new("Failed to render shopping list")
    })?;

    buffer
        .into_inner()
        .map_err(|_| ApiError::InternalServerError.new("Failed to render shopping list"))
}
