use leptos::prelude::*;

/// 404 Not Found Page
#[component]
pub fn NotFound() -> impl IntoView {
	view! {
		<div class="not-found">
			<h1>"Page not found"</h1>
			<p>"There is no rule canvas here."</p>
			<a href="/">"Back to the editor"</a>
		</div>
	}
}
