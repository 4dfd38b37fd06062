use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::error;
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent, WheelEvent, Window,
};

use super::config::EditorConfig;
use super::interaction::{KeyInput, Pointer, PointerButton};
use super::render;
use super::state::{OverlayModel, RuleCanvasState};
use super::types::{Point, Priority, RuleDetails, RuleId};

type Editor = StoredValue<RuleCanvasState, LocalStorage>;

fn viewport(window: &Window) -> (f64, f64) {
	(
		window
			.inner_width()
			.ok()
			.and_then(|v| v.as_f64())
			.unwrap_or(800.0),
		window
			.inner_height()
			.ok()
			.and_then(|v| v.as_f64())
			.unwrap_or(600.0),
	)
}

/// Publishes the editor's overlay model if it changed.
fn sync(editor: Editor, overlay: RwSignal<OverlayModel>) {
	let Some(model) = editor.try_with_value(|s| s.overlay()) else {
		return;
	};
	if overlay.with_untracked(|o| *o != model) {
		overlay.set(model);
	}
}

/// Runs one editor event at the current wall-clock time.
fn dispatch(editor: Editor, overlay: RwSignal<OverlayModel>, f: impl FnOnce(&mut RuleCanvasState, f64)) {
	let now = js_sys::Date::now();
	if editor.try_update_value(|s| f(s, now)).is_some() {
		sync(editor, overlay);
	}
}

fn edit_details(editor: Editor, overlay: RwSignal<OverlayModel>, edit: impl FnOnce(&mut RuleDetails)) {
	dispatch(editor, overlay, |s, _| {
		if let Some(mut form) = s.details_draft().cloned() {
			edit(&mut form);
			s.set_details_draft(form);
		}
	});
}

/// Maps a mouse event to canvas coordinates, undoing the current pan.
fn pointer_at(canvas: &HtmlCanvasElement, pan_offset: f64, ev: &MouseEvent) -> Pointer {
	let rect = canvas.get_bounding_client_rect();
	let (x, y) = (
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	);
	let button = match ev.button() {
		1 => PointerButton::Middle,
		2 => PointerButton::Secondary,
		_ => PointerButton::Primary,
	};
	let pointer = Pointer::primary(Point::new(x, y - pan_offset))
		.with_button(button)
		.with_screen_y(y);
	if ev.ctrl_key() || ev.meta_key() {
		pointer.with_ctrl()
	} else {
		pointer
	}
}

fn format_created(ms: f64) -> String {
	let date = js_sys::Date::new(&JsValue::from_f64(ms));
	String::from(date.to_locale_date_string("en-US", &JsValue::UNDEFINED))
}

#[component]
pub fn RuleCanvas(
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
	#[prop(optional)] config: EditorConfig,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let editor: Editor = StoredValue::new_local(RuleCanvasState::new(config));
	let overlay = RwSignal::new(editor.with_value(|s| s.overlay()));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let keydown_cb: Rc<RefCell<Option<Closure<dyn FnMut(KeyboardEvent)>>>> =
		Rc::new(RefCell::new(None));

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let Some(window) = web_sys::window() else {
			error!("rule canvas mounted without a window");
			return;
		};

		let (w, h) = if fullscreen {
			viewport(&window)
		} else {
			let parent = canvas.parent_element();
			(
				width.unwrap_or_else(|| parent.as_ref().map_or(800.0, |p| p.client_width() as f64)),
				height.unwrap_or_else(|| parent.as_ref().map_or(600.0, |p| p.client_height() as f64)),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx = match canvas.get_context("2d") {
			Ok(Some(ctx)) => ctx,
			_ => {
				error!("canvas has no 2d context");
				return;
			}
		};
		let Ok(ctx) = ctx.dyn_into::<CanvasRenderingContext2d>() else {
			error!("2d context is not a CanvasRenderingContext2d");
			return;
		};

		if fullscreen {
			let canvas_resize = canvas.clone();
			*resize_cb.borrow_mut() = Some(Closure::new(move || {
				if let Some(win) = web_sys::window() {
					let (nw, nh) = viewport(&win);
					canvas_resize.set_width(nw as u32);
					canvas_resize.set_height(nh as u32);
				}
			}));
			if let Some(ref cb) = *resize_cb.borrow() {
				let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		*keydown_cb.borrow_mut() = Some(Closure::new(move |ev: KeyboardEvent| {
			let key = KeyInput::from_key_name(&ev.key(), ev.ctrl_key() || ev.meta_key(), ev.shift_key());
			let now = js_sys::Date::now();
			let Some(handled) = editor.try_update_value(|s| s.key_down(key, now)) else {
				return;
			};
			if handled {
				ev.prevent_default();
				sync(editor, overlay);
			}
		}));
		if let Some(ref cb) = *keydown_cb.borrow() {
			let _ = window.add_event_listener_with_callback("keydown", cb.as_ref().unchecked_ref());
		}

		let animate_inner = animate.clone();
		*animate.borrow_mut() = Some(Closure::new(move || {
			let now = js_sys::Date::now();
			let Some(changed) = editor.try_update_value(|s| s.tick(now)) else {
				// Editor disposed with its owner; let the loop lapse.
				return;
			};
			if changed {
				sync(editor, overlay);
			}
			editor.with_value(|s| {
				render::render(s, &ctx, canvas.width() as f64, canvas.height() as f64)
			});
			if let (Some(win), Some(cb)) = (web_sys::window(), animate_inner.borrow().as_ref()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let on_pointer = move |ev: &MouseEvent| -> Option<Pointer> {
		let canvas = canvas_ref.get_untracked()?;
		let pan_offset = editor.try_with_value(|s| s.pan_offset())?;
		Some(pointer_at(&canvas, pan_offset, ev))
	};

	let on_mousedown = move |ev: MouseEvent| {
		let Some(p) = on_pointer(&ev) else {
			return;
		};
		// Middle presses would start autoscroll; presses during a label edit would
		// blur the input before the click commits it.
		let editing_label = editor.try_with_value(|s| s.is_editing_label()).unwrap_or(false);
		if p.button == PointerButton::Middle || editing_label {
			ev.prevent_default();
		}
		dispatch(editor, overlay, |s, now| s.pointer_down(p, now));
	};

	let on_mousemove = move |ev: MouseEvent| {
		if let Some(p) = on_pointer(&ev) {
			dispatch(editor, overlay, |s, now| s.pointer_move(p, now));
		}
	};

	let on_mouseup = move |_: MouseEvent| {
		dispatch(editor, overlay, |s, now| s.pointer_up(now));
	};

	let on_click = move |ev: MouseEvent| {
		if let Some(p) = on_pointer(&ev) {
			dispatch(editor, overlay, |s, now| s.click(p.position, now));
		}
	};

	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let delta = -ev.delta_y();
		dispatch(editor, overlay, |s, _| {
			s.pan(delta);
		});
	};

	let on_contextmenu = move |ev: MouseEvent| {
		ev.prevent_default();
		if let Some(p) = on_pointer(&ev) {
			dispatch(editor, overlay, |s, now| s.context_click(p.position, now));
		}
	};

	let container_style = if fullscreen {
		"position: fixed; inset: 0; overflow: hidden;"
	} else {
		"position: relative; overflow: hidden;"
	};

	view! {
		<div class="rule-canvas" style=container_style>
			<canvas
				node_ref=canvas_ref
				class="rule-canvas-surface"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseup
				on:click=on_click
				on:contextmenu=on_contextmenu
				on:wheel=on_wheel
				style=move || {
					let cursor = if overlay.with(|o| o.panning) { "grabbing" } else { "crosshair" };
					format!("display: block; cursor: {cursor};")
				}
			/>
			<ContextMenuOverlay editor=editor overlay=overlay />
			<LabelEditorOverlay editor=editor overlay=overlay />
			<DetailsOverlay editor=editor overlay=overlay />
			<NoticeToast overlay=overlay />
			<InfoLegend editor=editor overlay=overlay />
		</div>
	}
}

#[component]
fn ContextMenuOverlay(editor: Editor, overlay: RwSignal<OverlayModel>) -> impl IntoView {
	move || {
		let (menu, pan) = overlay.with(|o| (o.context_menu.clone(), o.pan_offset));
		menu.map(|menu| {
			let style = format!(
				"position: absolute; left: {}px; top: {}px;",
				menu.anchor.x,
				menu.anchor.y + pan
			);
			view! {
				<div class="context-menu" style=style>
					{menu
						.actions()
						.iter()
						.map(|&action| {
							view! {
								<button on:click=move |ev: MouseEvent| {
									ev.stop_propagation();
									dispatch(editor, overlay, |s, now| s.choose_menu_action(action, now));
								}>{action.title()}</button>
							}
						})
						.collect_view()}
				</div>
			}
		})
	}
}

#[component]
fn LabelEditorOverlay(editor: Editor, overlay: RwSignal<OverlayModel>) -> impl IntoView {
	// Rebuilt only when a different rule starts editing so typing keeps focus.
	let open = Memo::new(move |_| {
		overlay.with(|o| o.label_editor.as_ref().map(|e| (e.rule, e.center)))
	});
	let input_ref = NodeRef::<leptos::html::Input>::new();
	Effect::new(move |_| {
		if let Some(input) = input_ref.get() {
			let _ = input.focus();
			input.select();
		}
	});

	move || {
		open.get().map(|(_, center)| {
			let draft = overlay.with_untracked(|o| {
				o.label_editor.as_ref().map(|e| e.draft.clone()).unwrap_or_default()
			});
			let pan = overlay.with_untracked(|o| o.pan_offset);
			let style = format!(
				"position: absolute; left: {}px; top: {}px; width: 100px;",
				center.x - 50.0,
				center.y + pan - 12.0
			);
			view! {
				<input
					node_ref=input_ref
					class="label-editor"
					type="text"
					style=style
					prop:value=draft
					on:input=move |ev| {
						let text = event_target_value(&ev);
						dispatch(editor, overlay, |s, _| s.set_label_draft(&text));
					}
					on:blur=move |_| dispatch(editor, overlay, |s, now| s.commit_label_edit(now))
				/>
			}
		})
	}
}

fn details_field(
	editor: Editor,
	overlay: RwSignal<OverlayModel>,
	title: &'static str,
	value: String,
	set: fn(&mut RuleDetails, String),
) -> impl IntoView {
	view! {
		<label class="details-field">
			<span>{title}</span>
			<input
				type="text"
				prop:value=value
				on:input=move |ev| {
					let text = event_target_value(&ev);
					edit_details(editor, overlay, |form| set(form, text));
				}
			/>
		</label>
	}
}

#[component]
fn DetailsOverlay(editor: Editor, overlay: RwSignal<OverlayModel>) -> impl IntoView {
	let open: Memo<Option<RuleId>> =
		Memo::new(move |_| overlay.with(|o| o.details.as_ref().map(|(id, _)| *id)));

	move || {
		open.get().map(|rule| {
			let form = overlay
				.with_untracked(|o| o.details.as_ref().map(|(_, f)| f.clone()))
				.unwrap_or_default();
			let current = form.priority;
			view! {
				<div class="details-form">
					<h3>{format!("Rule {rule} details")}</h3>
					{details_field(editor, overlay, "Label", form.label, |f, v| f.label = v)}
					{details_field(editor, overlay, "Description", form.description, |f, v| {
						f.description = v
					})}
					{details_field(editor, overlay, "Eligibility", form.eligibility, |f, v| {
						f.eligibility = v
					})}
					{details_field(editor, overlay, "Conditions", form.conditions, |f, v| {
						f.conditions = v
					})}
					{details_field(editor, overlay, "Action", form.action, |f, v| f.action = v)}
					{details_field(editor, overlay, "Alternative action", form.alter_action, |f, v| {
						f.alter_action = v
					})}
					<label class="details-field">
						<span>"Priority"</span>
						<select on:change=move |ev| {
							let priority: Priority = event_target_value(&ev).parse().unwrap_or_default();
							edit_details(editor, overlay, |f| f.priority = priority);
						}>
							{Priority::ALL
								.into_iter()
								.map(|p| {
									view! {
										<option value=p.as_str() selected={p == current}>
											{p.as_str()}
										</option>
									}
								})
								.collect_view()}
						</select>
					</label>
					<div class="details-actions">
						<button on:click=move |_| {
							dispatch(editor, overlay, |s, now| s.save_details(now))
						}>"Save"</button>
						<button on:click=move |_| {
							dispatch(editor, overlay, |s, _| s.close_details())
						}>"Cancel"</button>
					</div>
				</div>
			}
		})
	}
}

#[component]
fn NoticeToast(overlay: RwSignal<OverlayModel>) -> impl IntoView {
	move || {
		overlay
			.with(|o| o.notice.clone())
			.map(|message| view! { <div class="notice" role="alert">{message}</div> })
	}
}

#[component]
fn InfoLegend(editor: Editor, overlay: RwSignal<OverlayModel>) -> impl IntoView {
	let counts = move || {
		overlay.with(|o| format!("{} rules, {} chains", o.rule_count, o.connection_count))
	};
	let undo_hint = move || {
		overlay.with(|o| match o.last_action {
			Some(action) => format!(
				"Ctrl+Z to undo {action} (step {} of {})",
				o.history_position, o.history_len
			),
			None => format!("Nothing to undo (step {} of {})", o.history_position, o.history_len),
		})
	};
	let protected = move || {
		overlay
			.with(|o| o.saved_position)
			.map(|n| view! { <p class="protected">{format!("{n} actions protected")}</p> })
	};
	let selected = move || {
		overlay.with(|o| o.selected.clone()).map(|summary| {
			let rule = summary.rule;
			view! {
				<div class="selected-rule">
					<h3>{rule.label}</h3>
					<p>{rule.description}</p>
					<p>{format!("Status: {} | Priority: {}", rule.status.as_str(), rule.priority)}</p>
					<p>{format!("Created {}", format_created(rule.created_at))}</p>
					<p>
						{format!(
							"{} incoming, {} outgoing",
							summary.incoming,
							summary.outgoing,
						)}
					</p>
					<p class="hint">"Click another rule to chain it after this one."</p>
				</div>
			}
		})
	};

	view! {
		<div class="info-legend">
			<h2>"Rule Chains"</h2>
			<p>"Click the canvas to add a rule. Click a rule, then another, to chain them."</p>
			<p>"Drag to move. Right-click for options. Middle-drag or Ctrl-drag to pan."</p>
			<p>{counts}</p>
			<p>{undo_hint}</p>
			{protected}
			<div class="legend-actions">
				<button
					disabled=move || !overlay.with(|o| o.can_undo)
					on:click=move |_| dispatch(editor, overlay, |s, now| s.undo(now))
				>
					"Undo"
				</button>
				<button
					disabled=move || !overlay.with(|o| o.can_redo)
					on:click=move |_| dispatch(editor, overlay, |s, now| s.redo(now))
				>
					"Redo"
				</button>
				<button
					disabled=move || overlay.with(|o| o.at_saved)
					on:click=move |_| dispatch(editor, overlay, |s, _| s.mark_saved())
				>
					"Mark saved"
				</button>
			</div>
			{selected}
		</div>
	}
}
