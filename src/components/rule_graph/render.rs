use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::interaction::MenuTarget;
use super::state::RuleCanvasState;
use super::types::{Rule, RuleStatus};

const ARROW_SIZE: f64 = 10.0;
const LABEL_CHARS: usize = 8;

/// Labels longer than eight characters are cut and suffixed with `...`.
fn short_label(label: &str) -> String {
	if label.chars().count() <= LABEL_CHARS {
		return label.to_owned();
	}
	let mut short: String = label.chars().take(LABEL_CHARS).collect();
	short.push_str("...");
	short
}

pub fn render(state: &RuleCanvasState, ctx: &CanvasRenderingContext2d, width: f64, height: f64) {
	ctx.set_fill_style_str("#f4f6fb");
	ctx.fill_rect(0.0, 0.0, width, height);
	ctx.save();
	let _ = ctx.translate(0.0, state.pan_offset());
	draw_connections(state, ctx);
	draw_rules(state, ctx);
	ctx.restore();
}

fn draw_connections(state: &RuleCanvasState, ctx: &CanvasRenderingContext2d) {
	let menu_target = state.context_menu().map(|m| &m.target);
	for conn in state.connections() {
		let Some((from, tip)) = state.connection_segment(conn) else {
			continue;
		};
		let dist = from.distance(tip);
		if dist < ARROW_SIZE {
			continue;
		}
		let (ux, uy) = ((tip.x - from.x) / dist, (tip.y - from.y) / dist);
		let highlighted = matches!(
			menu_target,
			Some(MenuTarget::Connection(id)) if *id == conn.id
		);
		let colour = if highlighted { "#e8590c" } else { "#5c7cfa" };

		ctx.set_stroke_style_str(colour);
		ctx.set_line_width(if highlighted { 3.0 } else { 2.0 });
		ctx.begin_path();
		ctx.move_to(from.x, from.y);
		ctx.line_to(tip.x - ux * ARROW_SIZE, tip.y - uy * ARROW_SIZE);
		ctx.stroke();

		let (back_x, back_y) = (tip.x - ux * ARROW_SIZE, tip.y - uy * ARROW_SIZE);
		let (px, py) = (-uy * ARROW_SIZE * 0.5, ux * ARROW_SIZE * 0.5);
		ctx.set_fill_style_str(colour);
		ctx.begin_path();
		ctx.move_to(tip.x, tip.y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	}
}

fn rule_fill(state: &RuleCanvasState, rule: &Rule) -> &'static str {
	if state.dragging() == Some(rule.id) {
		"#ffd43b"
	} else if state.selected() == Some(rule.id) {
		"#51cf66"
	} else {
		match rule.status {
			RuleStatus::Active => "#74c0fc",
			RuleStatus::Inactive => "#ced4da",
			RuleStatus::Draft => "#e5dbff",
		}
	}
}

fn draw_rules(state: &RuleCanvasState, ctx: &CanvasRenderingContext2d) {
	let radius = state.config.rule_radius;
	for rule in state.rules() {
		let (x, y) = (rule.position.x, rule.position.y);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(rule_fill(state, rule));
		ctx.fill();

		if rule.status == RuleStatus::Draft {
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(4.0),
				&JsValue::from_f64(3.0),
			));
		}
		ctx.set_stroke_style_str("#343a40");
		ctx.set_line_width(if state.selected() == Some(rule.id) { 3.0 } else { 1.5 });
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());

		ctx.set_fill_style_str("#212529");
		ctx.set_font("12px sans-serif");
		ctx.set_text_align("center");
		ctx.set_text_baseline("middle");
		let _ = ctx.fill_text(&short_label(&rule.label), x, y);
	}
}
