use yew::prelude::*;

/// Renders the introduction column
pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <div class="pill">{"Simulador de Lentes de Porcelana"}</div>
            <h1>{"Descubra o seu "}<br/><span class="accent">{"Novo Sorriso"}</span></h1>
            <p class="subtitle">
                {"Tire uma foto agora mesmo e veja como seu sorriso pode ficar com nossas Lentes de Porcelana, usando inteligência artificial de última geração."}
            </p>
        </header>
    }
}
