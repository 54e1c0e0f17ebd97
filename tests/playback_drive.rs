use std::collections::BTreeMap;

use kurbo::Rect;
use simviz::{
    Condition, Document, ElementContext, ElementKind, ElementSpec, Node, PlayState,
    PlaybackController, VisPayload, XIndex,
};

fn small_context(n: usize) -> ElementContext {
    let data: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let condition: Condition = serde_json::from_str(&format!(
        r##"{{"type":"level_static","data":{data:?},"color":"#fff",
           "min_height":0.0,"max_height":{max}.0}}"##,
        data = data,
        max = n
    ))
    .unwrap();

    let mut element_data = BTreeMap::new();
    element_data.insert(
        ElementKind::Cell,
        vec![ElementSpec {
            ids: vec!["tank".to_string()],
            description: "tank".to_string(),
            conditions: vec![condition],
            report_id: None,
        }],
    );
    let payload = VisPayload {
        x_series: data,
        element_data,
        overlays: BTreeMap::new(),
        color_scales: Vec::new(),
    };

    let mut doc = Document::new();
    doc.insert_node("tank", Node::with_bbox(Rect::new(0.0, 0.0, 10.0, 100.0)));
    ElementContext::new(payload, doc).unwrap()
}

#[test]
fn scheduler_drives_the_context_to_the_end() {
    let mut context = small_context(5);
    let mut controller = PlaybackController::new(context.series_len());

    let mut delay = controller.play(|x| context.update_elements(x));
    while delay.is_some() {
        delay = controller.tick(|x| context.update_elements(x));
    }

    assert_eq!(controller.state(), PlayState::Paused);
    assert_eq!(controller.current_x(), XIndex(4));
    assert_eq!(context.current_x(), XIndex(4));
    assert_eq!(context.current_label(), "4.00");
}

#[test]
fn pausing_mid_run_freezes_the_context() {
    let mut context = small_context(10);
    let mut controller = PlaybackController::new(context.series_len());

    controller.play(|x| context.update_elements(x));
    controller.tick(|x| context.update_elements(x));
    controller.tick(|x| context.update_elements(x));
    assert_eq!(context.current_x(), XIndex(2));

    controller.play(|x| context.update_elements(x));
    assert_eq!(controller.tick(|x| context.update_elements(x)), None);
    assert_eq!(context.current_x(), XIndex(2));
}

#[test]
fn slider_jumps_coalesce_into_the_latest_target() {
    let mut context = small_context(10);
    let mut controller = PlaybackController::new(context.series_len());

    controller.move_to(XIndex(3), |x| context.update_elements(x));
    controller.move_to(XIndex(6), |x| context.update_elements(x));
    controller.move_to(XIndex(8), |x| context.update_elements(x));
    assert_eq!(context.current_x(), XIndex(3));

    controller.settle(|x| context.update_elements(x));
    assert_eq!(context.current_x(), XIndex(8));
    assert_eq!(controller.current_x(), XIndex(8));
}

#[test]
fn playback_resumes_from_a_slider_jump() {
    let mut context = small_context(6);
    let mut controller = PlaybackController::new(context.series_len());

    controller.move_to(XIndex(3), |x| context.update_elements(x));
    controller.settle(|x| context.update_elements(x));

    controller.play(|x| context.update_elements(x));
    controller.tick(|x| context.update_elements(x));
    assert_eq!(context.current_x(), XIndex(4));
}
