use leptos::prelude::*;

use crate::components::rule_graph::RuleCanvas;

/// Default Home Page: a full-screen rule chain editor.
#[component]
pub fn Home() -> impl IntoView {
	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>
			<RuleCanvas fullscreen=true />
		</ErrorBoundary>
	}
}
