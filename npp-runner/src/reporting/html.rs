//! Standalone interactive HTML page for a chart.
//!
//! The figure is a Plotly.js figure embedded as JSON; the library itself is
//! loaded from the CDN. Output depends only on the chart model, so identical
//! inputs give byte-identical pages.

use serde_json::{json, Value};

use super::chart::{ChartModel, Marker, Trace};

pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

const MARKER_COLOR: &str = "black";
const MARKER_OPACITY: f64 = 0.5;

const HOVER_TEMPLATE: &str = "Date: %{customdata[0]}<br>\
Days from peak: %{x}<br>\
Closing value: %{customdata[1]:,.2f}<br>\
Fraction of peak: %{y:.1%}<extra></extra>";

fn trace_json(trace: &Trace) -> Value {
    let customdata: Vec<Value> = trace
        .dates
        .iter()
        .zip(&trace.closes)
        .map(|(date, close)| json!([date, close]))
        .collect();
    json!({
        "type": "scatter",
        "mode": "lines",
        "name": trace.name,
        "x": trace.days_from_peak,
        "y": trace.normalized,
        "customdata": customdata,
        "hovertemplate": HOVER_TEMPLATE,
        "line": { "color": trace.color, "width": trace.width },
        "opacity": trace.opacity,
    })
}

fn marker_shape(marker: &Marker) -> Value {
    json!({
        "type": "line",
        "xref": "x",
        "yref": "y",
        "x0": marker.x[0],
        "x1": marker.x[1],
        "y0": marker.y[0],
        "y1": marker.y[1],
        "opacity": MARKER_OPACITY,
        "line": { "color": MARKER_COLOR, "width": 2, "dash": "dash" },
    })
}

/// Plotly figure (`data`, `layout`, `config`) for the chart.
pub fn figure_json(chart: &ChartModel) -> Value {
    let data: Vec<Value> = chart.traces.iter().map(trace_json).collect();
    let tickvals: Vec<i64> = chart.ticks.iter().map(|t| t.offset).collect();
    let ticktext: Vec<&str> = chart.ticks.iter().map(|t| t.label.as_str()).collect();

    json!({
        "data": data,
        "layout": {
            "title": { "text": format!("<b>{}</b>", chart.title), "x": 0.5 },
            "width": chart.width,
            "height": chart.height,
            "xaxis": {
                "title": { "text": chart.x_label },
                "range": chart.x_range,
                "tickmode": "array",
                "tickvals": tickvals,
                "ticktext": ticktext,
                "zeroline": false,
            },
            "yaxis": {
                "title": { "text": chart.y_label },
                "range": chart.y_range,
                "zeroline": false,
            },
            "legend": { "x": 1.02, "y": 0.5, "yanchor": "middle", "itemclick": "toggle" },
            "hovermode": "closest",
            "shapes": [marker_shape(&chart.peak_marker), marker_shape(&chart.unity_marker)],
            "showlegend": true,
        },
        "config": {
            "displaylogo": false,
            "responsive": false,
            "toImageButtonOptions": { "format": "png" },
        },
    })
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Render the full page.
pub fn render_html(chart: &ChartModel) -> Result<String, serde_json::Error> {
    // `</` inside a JSON string would close the script element
    let figure = serde_json::to_string(&figure_json(chart))?.replace("</", "<\\/");
    let title = escape_html(&chart.title);
    let caption = escape_html(&chart.caption);

    let page = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{PLOTLY_CDN}" charset="utf-8"></script>
<style>
body {{ font-family: sans-serif; margin: 1em; }}
.caption {{ font-size: 3mm; color: #444; }}
</style>
</head>
<body>
<div id="npp" style="width:{w}px;height:{h}px;"></div>
<p class="caption">{caption}</p>
<script>
const figure = {figure};
Plotly.newPlot("npp", figure.data, figure.layout, figure.config);
</script>
</body>
</html>
"#,
        w = chart.width,
        h = chart.height,
    );
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::chart::{Tick, CHART_HEIGHT, CHART_WIDTH};

    fn sample_chart() -> ChartModel {
        ChartModel {
            title: "Progression of DJIA in last 1 recessions".into(),
            x_label: "Months from Peak".into(),
            y_label: "DJIA as fraction of Peak".into(),
            caption: "Source: historical DJIA data from Stooq.com, updated March 31, 2020.".into(),
            width: CHART_WIDTH,
            height: CHART_HEIGHT,
            traces: vec![Trace {
                name: "Feb 2020 - Apr 2020".into(),
                color: "blue".into(),
                width: 5.0,
                opacity: 0.7,
                days_from_peak: vec![0, 40],
                normalized: vec![1.0, 0.63],
                dates: vec!["2020-02-12".into(), "2020-03-23".into()],
                closes: vec![29551.42, 18591.93],
            }],
            ticks: vec![Tick { offset: 0, label: "peak".into() }],
            x_range: [-205.98, 1177.98],
            y_range: [0.5, 1.5],
            peak_marker: Marker { x: [0.0, 0.0], y: [-0.5, 2.0] },
            unity_marker: Marker { x: [-243.0, 1821.0], y: [1.0, 1.0] },
        }
    }

    #[test]
    fn figure_carries_traces_and_axes() {
        let fig = figure_json(&sample_chart());
        let trace = &fig["data"][0];
        assert_eq!(trace["name"], "Feb 2020 - Apr 2020");
        assert_eq!(trace["x"], json!([0, 40]));
        assert_eq!(trace["customdata"][1], json!(["2020-03-23", 18591.93]));
        assert_eq!(trace["line"]["width"], 5.0);
        assert_eq!(fig["layout"]["xaxis"]["ticktext"], json!(["peak"]));
        assert_eq!(fig["layout"]["width"], 800);
        assert_eq!(fig["layout"]["shapes"][0]["y1"], 2.0);
        assert_eq!(fig["layout"]["shapes"][1]["line"]["dash"], "dash");
    }

    #[test]
    fn page_embeds_figure_and_caption() {
        let page = render_html(&sample_chart()).unwrap();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains(PLOTLY_CDN));
        assert!(page.contains("<title>Progression of DJIA in last 1 recessions</title>"));
        assert!(page.contains("updated March 31, 2020."));
        assert!(page.contains("Plotly.newPlot(\"npp\""));
    }

    #[test]
    fn rendering_is_deterministic() {
        let chart = sample_chart();
        assert_eq!(render_html(&chart).unwrap(), render_html(&chart).unwrap());
    }

    #[test]
    fn labels_cannot_break_out_of_the_page() {
        let mut chart = sample_chart();
        chart.traces[0].name = "</script><b>x</b>".into();
        chart.caption = "a < b & c".into();
        let page = render_html(&chart).unwrap();
        assert!(!page.contains("</script><b>"));
        assert!(page.contains("a &lt; b &amp; c"));
    }
}
