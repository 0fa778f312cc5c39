use super::super::{Comparison, Model, Msg};
use super::comparison_view::ComparisonView;
use yew::prelude::*;

pub fn render_result_panel(comparison: &Comparison, ctx: &Context<Model>) -> Html {
    html! {
        <div class="simulator-card result-card">
            <div class="stage">
                <ComparisonView before={comparison.before.clone()} after={comparison.after.clone()} />
            </div>
            <div class="result-caption">
                <h3>{"Resultado da Simulação"}</h3>
                <p>{"Arraste para os lados para comparar o seu antes e depois."}</p>
                <button class="link-btn" onclick={ctx.link().callback(|_| Msg::Download)}>
                    {"Baixar imagem do resultado"}
                </button>
            </div>
        </div>
    }
}
