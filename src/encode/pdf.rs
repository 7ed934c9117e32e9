//! Single-page PDF wrapping one JPEG (`/DCTDecode`), sized to the image in points.

use std::io::Write;

use crate::foundation::error::{ConvertError, ConvertResult};

/// Write a one-page PDF whose page is exactly `width`x`height` points and shows `jpeg`.
pub fn write_jpeg_pdf(
    out: &mut impl Write,
    jpeg: &[u8],
    width: u32,
    height: u32,
) -> ConvertResult<()> {
    if width == 0 || height == 0 {
        return Err(ConvertError::validation("pdf page size must be non-zero"));
    }
    if jpeg.len() < 2 || jpeg[0] != 0xFF || jpeg[1] != 0xD8 {
        return Err(ConvertError::validation("pdf image payload must be a JPEG"));
    }

    let content = format!("q\n{width} 0 0 {height} 0 0 cm\n/Im0 Do\nQ\n");
    let objects: Vec<Vec<u8>> = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {width} {height}] \
             /Resources << /XObject << /Im0 4 0 R >> >> /Contents 5 0 R >>"
        )
        .into_bytes(),
        stream_object(
            &format!(
                "<< /Type /XObject /Subtype /Image /Width {width} /Height {height} \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>",
                jpeg.len()
            ),
            jpeg,
        ),
        stream_object(
            &format!("<< /Length {} >>", content.len()),
            content.as_bytes(),
        ),
    ];

    let mut buf: Vec<u8> = Vec::with_capacity(jpeg.len() + 1024);
    buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(buf.len());
        buf.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        buf.extend_from_slice(body);
        buf.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = buf.len();
    buf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    buf.extend_from_slice(b"0000000000 65535 f \n");
    for off in offsets {
        buf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    buf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );

    out.write_all(&buf)
        .map_err(|e| ConvertError::io(format!("failed to write pdf: {e}")))
}

fn stream_object(dict: &str, data: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(dict.len() + data.len() + 32);
    v.extend_from_slice(dict.as_bytes());
    v.extend_from_slice(b"\nstream\n");
    v.extend_from_slice(data);
    v.extend_from_slice(b"\nendstream");
    v
}
