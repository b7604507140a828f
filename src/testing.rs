use crate::{ApertureOptions, FormatOptions, GerberDocument};

/// A document in 2.4 inch format, leading zero suppression and absolute coordinates, without apertures.
pub fn inch_document() -> GerberDocument {
    let mut document = GerberDocument::new();
    document
        .set_format(
            FormatOptions::new()
                .zero("leading")
                .coordinates("absolute")
                .digits(2, 4)
                .unit("inch"),
        )
        .expect("valid format");
    document
}

/// A document in 3.3 millimeter format, leading zero suppression and absolute coordinates, without apertures.
pub fn millimeter_document() -> GerberDocument {
    let mut document = GerberDocument::new();
    document
        .set_format(
            FormatOptions::new()
                .zero("leading")
                .coordinates("absolute")
                .digits(3, 3)
                .unit("mm"),
        )
        .expect("valid format");
    document
}

/// [`inch_document`] with `D10` defined as a circle of `diameter`.
pub fn circle_document(diameter: f64) -> GerberDocument {
    let mut document = inch_document();
    document
        .define_aperture(ApertureOptions::new("D10", "C").modifiers(diameter.to_string()))
        .expect("valid aperture");
    document
}

pub fn dump_gerber_source(document: &GerberDocument) {
    println!("Gerber source:\n{}", gerber_source(document));
}

/// The function sequence as Gerber source, one function per line.
pub fn gerber_source(document: &GerberDocument) -> String {
    document
        .functions()
        .iter()
        .map(|function| function.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
