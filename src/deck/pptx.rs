//! PresentationML writer.
//!
//! Emits a minimal package with one master, one blank layout and
//! one theme, plus a slide part per deck slide. Images live under
//! `ppt/media`, named after the slide that embeds them.

use std::io::{Cursor, Write};

use log::trace;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{
  Deck, Frame, Slide, BODY_FONT_PT, BODY_FRAME, IMAGE_FRAME,
  SLIDE_HEIGHT_IN, SLIDE_WIDTH_IN, TITLE_FONT_PT, TITLE_FRAME,
};
use crate::error::Error;
use crate::illustrate::ImageFormat;

const EMU_PER_INCH: f64 = 914_400.0;

const XML_DECL: &str
  = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_MAIN: &str = concat!(
  r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
  r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
  r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#,
);
const REL_BASE: &str
  = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_BASE: &str
  = "application/vnd.openxmlformats-officedocument";

/// First relationship id in presentation.xml.rels after the master
const FIRST_SLIDE_RID: usize = 2;

fn emu(inches: f64) -> i64
{   (inches * EMU_PER_INCH).round() as i64
}

/// Escape text for element content and attribute values,
/// dropping characters XML 1.0 cannot carry
pub fn escape_xml(text: &str) -> String
{   let mut out = String::with_capacity(text.len());
    for c in text.chars()
    {   match c
        {   '&' => out.push_str("&amp;")
          , '<' => out.push_str("&lt;")
          , '>' => out.push_str("&gt;")
          , '"' => out.push_str("&quot;")
          , '\'' => out.push_str("&apos;")
          , '\t' | '\n' | '\r' => out.push(c)
          , c if (c as u32) < 0x20 => {}
          , '\u{FFFE}' | '\u{FFFF}' => {}
          , c => out.push(c)
        }
    }
    out
}

/// Zip container being filled part by part
struct Package
{   zip: ZipWriter<Cursor<Vec<u8>>>
  , options: FileOptions
}

impl Package
{   fn new() -> Self
    {   Package
        {   zip: ZipWriter::new(Cursor::new(Vec::new()))
          , options: FileOptions::default()
              .compression_method(CompressionMethod::Deflated)
        }
    }

    fn put(&mut self, name: &str, data: &[u8]) -> Result<(), Error>
    {   trace!("Writing part {} ({} bytes)", name, data.len());
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(data)?;
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>, Error>
    {   let cursor = self.zip.finish()?;
        Ok(cursor.into_inner())
    }
}

/// Write the deck as a zipped PresentationML package
pub fn write_presentation(deck: &Deck) -> Result<Vec<u8>, Error>
{   let mut package = Package::new();

    package.put("[Content_Types].xml", content_types(deck).as_bytes())?;
    package.put("_rels/.rels", root_rels().as_bytes())?;
    package.put("docProps/app.xml", app_props(deck).as_bytes())?;
    package.put("docProps/core.xml", core_props(deck).as_bytes())?;
    package.put("ppt/presentation.xml", presentation(deck).as_bytes())?;
    package.put(
      "ppt/_rels/presentation.xml.rels",
      presentation_rels(deck).as_bytes()
    )?;
    package.put("ppt/presProps.xml", pres_props().as_bytes())?;
    package.put("ppt/viewProps.xml", view_props().as_bytes())?;
    package.put("ppt/tableStyles.xml", table_styles().as_bytes())?;
    package.put("ppt/theme/theme1.xml", THEME.as_bytes())?;
    package.put(
      "ppt/slideMasters/slideMaster1.xml",
      slide_master().as_bytes()
    )?;
    package.put(
      "ppt/slideMasters/_rels/slideMaster1.xml.rels",
      slide_master_rels().as_bytes()
    )?;
    package.put(
      "ppt/slideLayouts/slideLayout1.xml",
      slide_layout().as_bytes()
    )?;
    package.put(
      "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
      slide_layout_rels().as_bytes()
    )?;

    for (i, slide) in deck.slides.iter().enumerate()
    {   let number = i + 1;
        package.put(
          &format!("ppt/slides/slide{}.xml", number),
          slide_xml(slide).as_bytes()
        )?;
        package.put(
          &format!("ppt/slides/_rels/slide{}.xml.rels", number),
          slide_rels(slide, number).as_bytes()
        )?;
        if let Some(image) = &slide.image
        {   package.put(
              &format!(
                "ppt/media/image{}.{}",
                number,
                image.format.extension()
              ),
              &image.data
            )?;
        }
    }

    package.finish()
}

fn content_types(deck: &Deck) -> String
{   let mut xml = format!(
      "{}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
       <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
       <Default Extension=\"xml\" ContentType=\"application/xml\"/>",
      XML_DECL
    );
    for format in ImageFormat::ALL
    {   xml.push_str(&format!(
          "<Default Extension=\"{}\" ContentType=\"{}\"/>",
          format.extension(),
          format.content_type()
        ));
    }
    let parts = [
      ("/ppt/presentation.xml", "presentationml.presentation.main+xml"),
      ("/ppt/presProps.xml", "presentationml.presProps+xml"),
      ("/ppt/viewProps.xml", "presentationml.viewProps+xml"),
      ("/ppt/tableStyles.xml", "presentationml.tableStyles+xml"),
      ("/ppt/theme/theme1.xml", "theme+xml"),
      ("/ppt/slideMasters/slideMaster1.xml", "presentationml.slideMaster+xml"),
      ("/ppt/slideLayouts/slideLayout1.xml", "presentationml.slideLayout+xml"),
      ("/docProps/app.xml", "extended-properties+xml"),
    ];
    for (part, kind) in parts
    {   xml.push_str(&format!(
          "<Override PartName=\"{}\" ContentType=\"{}.{}\"/>",
          part, CT_BASE, kind
        ));
    }
    xml.push_str(
      "<Override PartName=\"/docProps/core.xml\" \
       ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>"
    );
    for number in 1..=deck.slides.len()
    {   xml.push_str(&format!(
          "<Override PartName=\"/ppt/slides/slide{}.xml\" \
           ContentType=\"{}.presentationml.slide+xml\"/>",
          number, CT_BASE
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn relationship(id: &str, kind: &str, target: &str) -> String
{   format!(
      "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"/>",
      id, kind, target
    )
}

fn relationships(entries: &[String]) -> String
{   format!(
      "{}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">{}</Relationships>",
      XML_DECL,
      entries.concat()
    )
}

fn root_rels() -> String
{   relationships(&[
      relationship(
        "rId1",
        &format!("{}/officeDocument", REL_BASE),
        "ppt/presentation.xml"
      ),
      relationship(
        "rId2",
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties",
        "docProps/core.xml"
      ),
      relationship(
        "rId3",
        &format!("{}/extended-properties", REL_BASE),
        "docProps/app.xml"
      ),
    ])
}

fn app_props(deck: &Deck) -> String
{   format!(
      "{}<Properties xmlns=\"http://schemas.openxmlformats.org/officeDocument/2006/extended-properties\" \
       xmlns:vt=\"http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes\">\
       <Application>deckgen</Application>\
       <Slides>{}</Slides>\
       </Properties>",
      XML_DECL,
      deck.slides.len()
    )
}

fn core_props(deck: &Deck) -> String
{   format!(
      "{}<cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
       xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
       xmlns:dcterms=\"http://purl.org/dc/terms/\" \
       xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\
       <dc:title>{}</dc:title>\
       <dc:creator>deckgen</dc:creator>\
       <cp:revision>1</cp:revision>\
       </cp:coreProperties>",
      XML_DECL,
      escape_xml(&deck.title)
    )
}

fn presentation(deck: &Deck) -> String
{   let slide_ids: String = (0..deck.slides.len())
      .map(|i| format!(
        "<p:sldId id=\"{}\" r:id=\"rId{}\"/>",
        256 + i,
        FIRST_SLIDE_RID + i
      ))
      .collect();
    let slide_list = if slide_ids.is_empty()
    {   String::new()
    } else
    {   format!("<p:sldIdLst>{}</p:sldIdLst>", slide_ids)
    };

    format!(
      "{}<p:presentation {} saveSubsetFonts=\"1\">\
       <p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>\
       {}\
       <p:sldSz cx=\"{}\" cy=\"{}\"/>\
       <p:notesSz cx=\"6858000\" cy=\"9144000\"/>\
       </p:presentation>",
      XML_DECL,
      NS_MAIN,
      slide_list,
      emu(SLIDE_WIDTH_IN),
      emu(SLIDE_HEIGHT_IN)
    )
}

fn presentation_rels(deck: &Deck) -> String
{   let mut entries = vec![relationship(
      "rId1",
      &format!("{}/slideMaster", REL_BASE),
      "slideMasters/slideMaster1.xml"
    )];
    for i in 0..deck.slides.len()
    {   entries.push(relationship(
          &format!("rId{}", FIRST_SLIDE_RID + i),
          &format!("{}/slide", REL_BASE),
          &format!("slides/slide{}.xml", i + 1)
        ));
    }
    let next = FIRST_SLIDE_RID + deck.slides.len();
    let trailing = [
      ("presProps", "presProps.xml"),
      ("viewProps", "viewProps.xml"),
      ("theme", "theme/theme1.xml"),
      ("tableStyles", "tableStyles.xml"),
    ];
    for (offset, (kind, target)) in trailing.iter().enumerate()
    {   entries.push(relationship(
          &format!("rId{}", next + offset),
          &format!("{}/{}", REL_BASE, kind),
          target
        ));
    }
    relationships(&entries)
}

fn pres_props() -> String
{   format!("{}<p:presentationPr {}/>", XML_DECL, NS_MAIN)
}

fn view_props() -> String
{   format!(
      "{}<p:viewPr {}><p:gridSpacing cx=\"76200\" cy=\"76200\"/></p:viewPr>",
      XML_DECL, NS_MAIN
    )
}

fn table_styles() -> String
{   format!(
      "{}<a:tblStyleLst xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
       def=\"{{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}}\"/>",
      XML_DECL
    )
}

/// Empty group header every shape tree starts with
const SP_TREE_HEADER: &str = "<p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/>\
  <p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>\
  <p:grpSpPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/>\
  <a:chOff x=\"0\" y=\"0\"/><a:chExt cx=\"0\" cy=\"0\"/></a:xfrm></p:grpSpPr>";

fn slide_master() -> String
{   format!(
      "{}<p:sldMaster {}>\
       <p:cSld><p:bg><p:bgRef idx=\"1001\"><a:schemeClr val=\"bg1\"/></p:bgRef></p:bg>\
       <p:spTree>{}</p:spTree></p:cSld>\
       <p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" \
       accent2=\"accent2\" accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" \
       accent6=\"accent6\" hlink=\"hlink\" folHlink=\"folHlink\"/>\
       <p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/></p:sldLayoutIdLst>\
       <p:txStyles>\
       <p:titleStyle><a:lvl1pPr><a:defRPr sz=\"4400\"/></a:lvl1pPr></p:titleStyle>\
       <p:bodyStyle><a:lvl1pPr><a:defRPr sz=\"1800\"/></a:lvl1pPr></p:bodyStyle>\
       <p:otherStyle><a:lvl1pPr><a:defRPr sz=\"1800\"/></a:lvl1pPr></p:otherStyle>\
       </p:txStyles></p:sldMaster>",
      XML_DECL, NS_MAIN, SP_TREE_HEADER
    )
}

fn slide_master_rels() -> String
{   relationships(&[
      relationship(
        "rId1",
        &format!("{}/slideLayout", REL_BASE),
        "../slideLayouts/slideLayout1.xml"
      ),
      relationship(
        "rId2",
        &format!("{}/theme", REL_BASE),
        "../theme/theme1.xml"
      ),
    ])
}

fn slide_layout() -> String
{   format!(
      "{}<p:sldLayout {} preserve=\"1\">\
       <p:cSld name=\"Blank\"><p:spTree>{}</p:spTree></p:cSld>\
       <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>\
       </p:sldLayout>",
      XML_DECL, NS_MAIN, SP_TREE_HEADER
    )
}

fn slide_layout_rels() -> String
{   relationships(&[relationship(
      "rId1",
      &format!("{}/slideMaster", REL_BASE),
      "../slideMasters/slideMaster1.xml"
    )])
}

fn xfrm(frame: &Frame) -> String
{   format!(
      "<a:xfrm><a:off x=\"{}\" y=\"{}\"/><a:ext cx=\"{}\" cy=\"{}\"/></a:xfrm>",
      emu(frame.x),
      emu(frame.y),
      emu(frame.w),
      emu(frame.h)
    )
}

fn text_shape(
  id: u32
, name: &str
, frame: &Frame
, text: &str
, font_pt: u32
, bold: bool
) -> String
{   let run_props = format!(
      "<a:rPr lang=\"en-US\" sz=\"{}\"{} dirty=\"0\"/>",
      font_pt * 100,
      if bold { " b=\"1\"" } else { "" }
    );
    let paragraphs: String = text
      .lines()
      .map(|line| {
        if line.is_empty()
        {   format!("<a:p><a:endParaRPr lang=\"en-US\" sz=\"{}\"/></a:p>",
              font_pt * 100)
        } else
        {   format!(
              "<a:p><a:r>{}<a:t>{}</a:t></a:r></a:p>",
              run_props,
              escape_xml(line)
            )
        }
      })
      .collect();
    let paragraphs = if paragraphs.is_empty()
    {   "<a:p/>".to_string()
    } else
    {   paragraphs
    };

    format!(
      "<p:sp><p:nvSpPr><p:cNvPr id=\"{}\" name=\"{}\"/>\
       <p:cNvSpPr txBox=\"1\"/><p:nvPr/></p:nvSpPr>\
       <p:spPr>{}<a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>\
       <p:txBody><a:bodyPr wrap=\"square\" rtlCol=\"0\"><a:normAutofit/></a:bodyPr>\
       <a:lstStyle/>{}</p:txBody></p:sp>",
      id,
      name,
      xfrm(frame),
      paragraphs
    )
}

fn picture(id: u32, frame: &Frame) -> String
{   format!(
      "<p:pic><p:nvPicPr><p:cNvPr id=\"{}\" name=\"Picture {}\"/>\
       <p:cNvPicPr><a:picLocks noChangeAspect=\"1\"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>\
       <p:blipFill><a:blip r:embed=\"rId2\"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>\
       <p:spPr>{}<a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></p:spPr></p:pic>",
      id,
      id - 1,
      xfrm(frame)
    )
}

fn slide_xml(slide: &Slide) -> String
{   let mut shapes = text_shape(
      2, "Title 1", &TITLE_FRAME, &slide.title, TITLE_FONT_PT, true
    );
    shapes.push_str(&text_shape(
      3, "Body 2", &BODY_FRAME, &slide.body, BODY_FONT_PT, false
    ));
    if slide.image.is_some()
    {   shapes.push_str(&picture(4, &IMAGE_FRAME));
    }

    format!(
      "{}<p:sld {}><p:cSld><p:spTree>{}{}</p:spTree></p:cSld>\
       <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>",
      XML_DECL, NS_MAIN, SP_TREE_HEADER, shapes
    )
}

fn slide_rels(slide: &Slide, number: usize) -> String
{   let mut entries = vec![relationship(
      "rId1",
      &format!("{}/slideLayout", REL_BASE),
      "../slideLayouts/slideLayout1.xml"
    )];
    if let Some(image) = &slide.image
    {   entries.push(relationship(
          "rId2",
          &format!("{}/image", REL_BASE),
          &format!(
            "../media/image{}.{}",
            number,
            image.format.extension()
          )
        ));
    }
    relationships(&entries)
}

const THEME: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="44546A"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2><a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2><a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4><a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6><a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink></a:clrScheme><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#;

#[cfg(test)]
mod tests
{   use super::*;
    use std::io::Read;

    use crate::illustrate::ImageAsset;

    fn read_part(bytes: &[u8], name: &str) -> String
    {   let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
          .expect("deck should be a zip");
        let mut part = archive.by_name(name)
          .expect("part should exist");
        let mut xml = String::new();
        part.read_to_string(&mut xml).expect("part should be utf-8");
        xml
    }

    fn deck() -> Deck
    {   Deck
        {   title: "R&D <Plans>".to_string()
          , slides: vec![
              Slide
              {   title: "Slide 1".to_string()
                , body: "Line one\nLine \"two\"".to_string()
                , image: ImageAsset::new(
                    None,
                    b"\x89PNG\r\n\x1a\nxxxx".to_vec()
                  ).ok()
              },
              Slide
              {   title: "Slide 2".to_string()
                , body: "No picture".to_string()
                , image: None
              },
            ]
        }
    }

    #[test]
    fn escapes_markup_and_drops_control_characters()
    {   assert_eq!(
          escape_xml("a<b>&\"c'\u{1}\n"),
          "a&lt;b&gt;&amp;&quot;c&apos;\n"
        );
    }

    #[test]
    fn package_lists_every_slide_and_image()
    {   let bytes = write_presentation(&deck())
          .expect("deck should serialize");
        let archive = zip::ZipArchive::new(Cursor::new(&bytes[..]))
          .expect("deck should be a zip");
        let names: Vec<&str> = archive.file_names().collect();

        assert!(names.contains(&"ppt/slides/slide1.xml"));
        assert!(names.contains(&"ppt/slides/slide2.xml"));
        assert!(names.contains(&"ppt/media/image1.png"));
        assert!(!names.iter().any(|n| n.starts_with("ppt/media/image2")));

        let types = read_part(&bytes, "[Content_Types].xml");
        assert!(types.contains("/ppt/slides/slide2.xml"));
        assert!(types.contains(
          "<Default Extension=\"png\" ContentType=\"image/png\"/>"
        ));
        assert!(types.contains(
          "<Default Extension=\"jpeg\" ContentType=\"image/jpeg\"/>"
        ));

        let presentation = read_part(&bytes, "ppt/presentation.xml");
        assert_eq!(presentation.matches("<p:sldId ").count(), 2);
        assert!(presentation.contains("cx=\"9144000\" cy=\"5143500\""));
    }

    #[test]
    fn slide_parts_carry_text_and_layout()
    {   let bytes = write_presentation(&deck())
          .expect("deck should serialize");

        let first = read_part(&bytes, "ppt/slides/slide1.xml");
        assert!(first.contains("<a:t>Slide 1</a:t>"));
        assert!(first.contains("<a:t>Line one</a:t>"));
        assert!(first.contains("<a:t>Line &quot;two&quot;</a:t>"));
        assert!(first.contains("sz=\"2400\" b=\"1\""));
        assert!(first.contains("<p:pic>"));
        assert!(first.contains("<a:off x=\"457200\" y=\"2286000\"/>"));

        let second = read_part(&bytes, "ppt/slides/slide2.xml");
        assert!(!second.contains("<p:pic>"));

        let core = read_part(&bytes, "docProps/core.xml");
        assert!(core.contains("R&amp;D &lt;Plans&gt;"));
    }
}
