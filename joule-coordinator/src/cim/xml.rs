//! CIM XML serialization
//!
//! Writes a [`CimDocument`] as a `NotifyAggregatedTimeSeries_MarketDocument`
//! element tree. Serialization is a pure function of the document, so two
//! identical documents produce byte-identical XML.

use std::io::Cursor;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::cim::{CimDocument, Period, Series};

const CIM_NAMESPACE: &str = "urn:ediel.org:measure:notifyaggregatedtimeseries:0:1";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "urn:ediel.org:measure:notifyaggregatedtimeseries:0:1 urn-ediel-org-measure-notifyaggregatedtimeseries-0-1.xsd";

/// GLN coding scheme
const CODING_SCHEME_GS1: &str = "A10";
/// Danish grid-area coding scheme
const CODING_SCHEME_GRID_AREA: &str = "NDK";

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Serializes one document to an XML string
pub fn to_xml(document: &CimDocument) -> std::io::Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("cim:NotifyAggregatedTimeSeries_MarketDocument");
    root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
    root.push_attribute(("xmlns:cim", CIM_NAMESPACE));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    emit(&mut writer, Event::Start(root))?;

    text_element(&mut writer, "cim:mRID", &document.message_id)?;
    text_element(&mut writer, "cim:type", &document.type_code)?;
    text_element(&mut writer, "cim:process.processType", &document.process_type_code)?;
    text_element(&mut writer, "cim:businessSector.type", &document.business_sector_code)?;
    coded_element(
        &mut writer,
        "cim:sender_MarketParticipant.mRID",
        CODING_SCHEME_GS1,
        &document.sender_id,
    )?;
    text_element(
        &mut writer,
        "cim:sender_MarketParticipant.marketRole.type",
        &document.sender_role,
    )?;
    coded_element(
        &mut writer,
        "cim:receiver_MarketParticipant.mRID",
        CODING_SCHEME_GS1,
        &document.receiver_id,
    )?;
    text_element(
        &mut writer,
        "cim:receiver_MarketParticipant.marketRole.type",
        &document.receiver_role,
    )?;
    text_element(
        &mut writer,
        "cim:createdDateTime",
        &format_instant(document.created),
    )?;

    for series in &document.series {
        write_series(&mut writer, series)?;
    }

    emit(&mut writer, Event::End(BytesEnd::new(
        "cim:NotifyAggregatedTimeSeries_MarketDocument",
    )))?;

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

fn emit(writer: &mut XmlWriter, event: Event<'_>) -> std::io::Result<()> {
    writer.write_event(event).map_err(std::io::Error::other)
}

fn write_series(writer: &mut XmlWriter, series: &Series) -> std::io::Result<()> {
    emit(writer, Event::Start(BytesStart::new("cim:Series")))?;

    text_element(writer, "cim:mRID", &series.id)?;
    text_element(writer, "cim:version", &series.version)?;
    text_element(
        writer,
        "cim:marketEvaluationPoint.type",
        &series.metering_point_type,
    )?;
    if !series.settlement_method.is_empty() {
        text_element(
            writer,
            "cim:marketEvaluationPoint.settlementMethod",
            &series.settlement_method,
        )?;
    }
    coded_element(
        writer,
        "cim:meteringGridArea_Domain.mRID",
        CODING_SCHEME_GRID_AREA,
        &series.grid_area,
    )?;
    text_element(writer, "cim:product", &series.product_code)?;
    text_element(writer, "cim:quantity_Measure_Unit.name", &series.quantity_unit)?;
    write_period(writer, &series.period)?;

    emit(writer, Event::End(BytesEnd::new("cim:Series")))?;
    Ok(())
}

fn write_period(writer: &mut XmlWriter, period: &Period) -> std::io::Result<()> {
    emit(writer, Event::Start(BytesStart::new("cim:Period")))?;
    text_element(writer, "cim:resolution", &period.resolution)?;

    emit(writer, Event::Start(BytesStart::new("cim:timeInterval")))?;
    text_element(writer, "cim:start", &format_interval_bound(period.start))?;
    text_element(writer, "cim:end", &format_interval_bound(period.end))?;
    emit(writer, Event::End(BytesEnd::new("cim:timeInterval")))?;

    for point in &period.points {
        emit(writer, Event::Start(BytesStart::new("cim:Point")))?;
        text_element(writer, "cim:position", &point.position.to_string())?;
        text_element(writer, "cim:quantity", &point.quantity.to_string())?;
        text_element(writer, "cim:quality", &point.quality)?;
        emit(writer, Event::End(BytesEnd::new("cim:Point")))?;
    }

    emit(writer, Event::End(BytesEnd::new("cim:Period")))?;
    Ok(())
}

fn text_element(writer: &mut XmlWriter, name: &str, value: &str) -> std::io::Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(value)))?;
    emit(writer, Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn coded_element(
    writer: &mut XmlWriter,
    name: &str,
    coding_scheme: &str,
    value: &str,
) -> std::io::Result<()> {
    let mut element = BytesStart::new(name);
    element.push_attribute(("codingScheme", coding_scheme));
    emit(writer, Event::Start(element))?;
    emit(writer, Event::Text(BytesText::new(value)))?;
    emit(writer, Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn format_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Interval bounds use minute precision, e.g. `2020-10-02T03:00Z`
fn format_interval_bound(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%MZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cim::tests::{FixedClock, SeqIds};
    use crate::cim::{CimDocumentBuilder, DocumentContext};
    use joule_core::domain::market::ProcessType;
    use joule_core::domain::result_row::ResultRow;
    use rust_decimal::Decimal;

    fn document() -> CimDocument {
        let rows = vec![
            ResultRow {
                job_id: "job".to_string(),
                snapshot_id: "snapshot".to_string(),
                result_id: "result".to_string(),
                result_name: "hourly_consumption".to_string(),
                grid_area: "500".to_string(),
                in_grid_area: None,
                out_grid_area: None,
                balance_responsible_id: "brp".to_string(),
                energy_supplier_id: "supplier".to_string(),
                start_datetime: "2020-10-02T04:00:00Z".parse().unwrap(),
                end_datetime: "2020-10-02T05:00:00Z".parse().unwrap(),
                resolution: "PT1H".to_string(),
                sum_quantity: Decimal::new(125, 1),
                quality: "A04".to_string(),
                metering_point_type: "E17".to_string(),
                settlement_method: "E02".to_string(),
            },
            ResultRow {
                job_id: "job".to_string(),
                snapshot_id: "snapshot".to_string(),
                result_id: "result".to_string(),
                result_name: "hourly_consumption".to_string(),
                grid_area: "500".to_string(),
                in_grid_area: None,
                out_grid_area: None,
                balance_responsible_id: "brp".to_string(),
                energy_supplier_id: "supplier".to_string(),
                start_datetime: "2020-10-02T03:00:00Z".parse().unwrap(),
                end_datetime: "2020-10-02T04:00:00Z".parse().unwrap(),
                resolution: "PT1H".to_string(),
                sum_quantity: Decimal::from(96),
                quality: "A04".to_string(),
                metering_point_type: "E17".to_string(),
                settlement_method: "E02".to_string(),
            },
        ];
        let context = DocumentContext {
            process_type: ProcessType::BalanceFixing,
            receiver_id: "5799999933318".to_string(),
            receiver_role: "MDR".to_string(),
            interval_start: "2020-10-02T03:00:00Z".parse().unwrap(),
            interval_end: "2020-10-03T04:00:00Z".parse().unwrap(),
        };
        let builder = CimDocumentBuilder::new("5790001330552")
            .with_clock(FixedClock("2021-09-06T10:00:00Z".parse().unwrap()))
            .with_ids(SeqIds::new());

        builder.build_documents(&rows, &context).remove(0)
    }

    #[test]
    fn test_xml_carries_header_fields() {
        let xml = to_xml(&document()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<cim:NotifyAggregatedTimeSeries_MarketDocument"));
        assert!(xml.contains("<cim:mRID>m-1</cim:mRID>"));
        assert!(xml.contains("<cim:type>E31</cim:type>"));
        assert!(xml.contains("<cim:process.processType>D04</cim:process.processType>"));
        assert!(xml.contains("<cim:businessSector.type>23</cim:businessSector.type>"));
        assert!(xml.contains(
            "<cim:sender_MarketParticipant.mRID codingScheme=\"A10\">5790001330552</cim:sender_MarketParticipant.mRID>"
        ));
        assert!(xml.contains("<cim:createdDateTime>2021-09-06T10:00:00Z</cim:createdDateTime>"));
    }

    #[test]
    fn test_xml_points_are_ordered_and_positioned() {
        let xml = to_xml(&document()).unwrap();

        let first = xml.find("<cim:position>1</cim:position>").unwrap();
        let second = xml.find("<cim:position>2</cim:position>").unwrap();
        assert!(first < second);
        // Earlier observation comes first regardless of input order.
        assert!(xml.contains("<cim:quantity>96</cim:quantity>"));
        assert!(xml.contains("<cim:quantity>12.5</cim:quantity>"));
        let q96 = xml.find("<cim:quantity>96</cim:quantity>").unwrap();
        let q125 = xml.find("<cim:quantity>12.5</cim:quantity>").unwrap();
        assert!(q96 < q125);
    }

    #[test]
    fn test_xml_series_carries_grid_area_scheme_and_product() {
        let xml = to_xml(&document()).unwrap();

        assert!(xml.contains(
            "<cim:meteringGridArea_Domain.mRID codingScheme=\"NDK\">500</cim:meteringGridArea_Domain.mRID>"
        ));
        assert!(xml.contains("<cim:product>8716867000030</cim:product>"));
        assert!(xml.contains("<cim:quantity_Measure_Unit.name>KWH</cim:quantity_Measure_Unit.name>"));
        assert!(xml.contains("<cim:resolution>PT1H</cim:resolution>"));
        assert!(xml.contains("<cim:start>2020-10-02T03:00Z</cim:start>"));
        assert!(xml.contains("<cim:end>2020-10-03T04:00Z</cim:end>"));
    }

    #[test]
    fn test_identical_documents_serialize_identically() {
        let document = document();
        assert_eq!(to_xml(&document).unwrap(), to_xml(&document).unwrap());
    }
}
