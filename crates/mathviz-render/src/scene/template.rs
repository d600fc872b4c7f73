//! Python source fragments for generated Manim scene modules.
//!
//! A module is `HEADER`, the per-beat constants, `RUNTIME`, then one scene
//! class whose `construct` body comes from [`body_for`]. Bodies are indented
//! for a method and read the beat's visual fields from `v`.

use mathviz_core::BeatType;

pub(crate) const HEADER: &str = r#"# -*- coding: utf-8 -*-
# Generated by mathviz. Do not edit.
import json
from pathlib import Path

import numpy as np
from manim import *
"#;

pub(crate) const RUNTIME: &str = r##"
_SAFE_NS = {
    "__builtins__": {},
    "np": np,
    "sin": np.sin,
    "cos": np.cos,
    "tan": np.tan,
    "exp": np.exp,
    "log": np.log,
    "sqrt": np.sqrt,
    "abs": abs,
    "pi": np.pi,
    "e": np.e,
}


def _color(value, fallback=YELLOW):
    if isinstance(value, str) and value:
        if value.startswith("#"):
            return value
        return globals().get(value, fallback)
    return fallback


class BeatScene(Scene):
    MARGIN_X = 0.85
    MARGIN_Y = 0.88
    equation_font_size = 36
    title_font_size = 48
    subtitle_font_size = 28

    def setup_theme(self):
        self.v = _BEAT.get("visual") or {}
        self.accent = _color(_BEAT.get("accent_color"), BLUE_C)
        if _BEAT.get("theme", "dark") == "dark":
            self.camera.background_color = "#1e1e2e"
        else:
            self.camera.background_color = "#fafafa"

    def add_audio(self):
        if _AUDIO_FILE and Path(_AUDIO_FILE).exists():
            self.add_sound(_AUDIO_FILE)

    def fit(self, mob):
        max_w = config.frame_width * self.MARGIN_X
        max_h = config.frame_height * self.MARGIN_Y
        if mob.width > max_w:
            mob.scale(max_w / mob.width)
        if mob.height > max_h:
            mob.scale(max_h / mob.height)
        return mob

    def safe_tex(self, latex, font_size=36, **kwargs):
        return self.fit(MathTex(latex, font_size=font_size, **kwargs))

    def safe_text(self, text, font_size=28, **kwargs):
        return self.fit(Text(text, font_size=font_size, **kwargs))

    def show_title(self, title, subtitle=None):
        heading = self.safe_text(title, font_size=self.title_font_size, color=WHITE, weight=BOLD)
        group = VGroup(heading)
        if subtitle:
            sub = self.safe_text(subtitle, font_size=self.subtitle_font_size, color=self.accent)
            sub.next_to(heading, DOWN, buff=0.4)
            group.add(sub)
        self.fit(group)
        group.move_to(ORIGIN)
        self.play(FadeIn(group, shift=UP * 0.5), run_time=1.0)
        self.wait(max(0.3, _DURATION - 2.0))
        self.play(FadeOut(group, shift=UP * 0.5), run_time=1.0)

    def show_equation(self, latex, label=None, position=UP * 0.3):
        equation = self.safe_tex(latex, font_size=self.equation_font_size, color=WHITE)
        group = VGroup(equation)
        label_text = None
        if label:
            label_text = self.safe_text(
                label, font_size=self.equation_font_size - 8, color=self.accent, slant=ITALIC
            )
            label_text.next_to(equation, DOWN, buff=0.3)
            group.add(label_text)
        self.fit(group)
        group.move_to(position)
        self.play(Write(equation), run_time=1.5)
        if label_text is not None:
            self.play(FadeIn(label_text), run_time=0.5)

    def create_axes(self, x_range, y_range, x_length=8.0, y_length=6.0):
        return Axes(
            x_range=list(x_range),
            y_range=list(y_range),
            x_length=x_length,
            y_length=y_length,
            axis_config={"color": WHITE, "include_numbers": True, "font_size": 20},
        )

    def number_plane(self):
        return NumberPlane(
            x_range=[-4, 4, 1],
            y_range=[-3, 3, 1],
            background_line_style={"stroke_opacity": 0.3},
        )

    def pad_to_duration(self):
        try:
            remaining = _DURATION - self.renderer.time
            if remaining > 0.05:
                self.wait(remaining)
        except Exception:
            pass
"##;

const TITLE_CARD: &str = r#"        self.show_title(str(v.get("title", "")), v.get("subtitle") or None)
"#;

const EQUATION_REVEAL: &str = r#"        self.show_equation(str(v.get("latex", "")), label=v.get("label") or None)
"#;

const EQUATION_TRANSFORM: &str = r#"        eq1 = self.safe_tex(str(v.get("from_latex", "")), color=WHITE)
        eq1.move_to(ORIGIN)
        self.play(Write(eq1), run_time=1.0)
        self.wait(0.4)
        eq2 = self.safe_tex(str(v.get("to_latex", "")), color=WHITE)
        eq2.move_to(ORIGIN)
        self.play(TransformMatchingTex(eq1, eq2), run_time=1.5)
"#;

const HIGHLIGHT: &str = r#"        color = _color(v.get("color"), YELLOW)
        eq = self.safe_tex(str(v.get("target", "")), font_size=self.equation_font_size, color=WHITE)
        eq.move_to(ORIGIN)
        box = SurroundingRectangle(eq, color=color, buff=0.15, corner_radius=0.1)
        self.play(Write(eq), run_time=1.8)
        self.play(Create(box), eq.animate.set_color(color), run_time=1.5)
"#;

const STEP_REVEAL: &str = r#"        step = self.safe_text(f"Step {v.get('step_number', 1)}", font_size=24, color=self.accent)
        step.to_edge(UP, buff=0.5)
        eq = self.safe_tex(str(v.get("latex", "")), font_size=self.equation_font_size, color=WHITE)
        eq.move_to(ORIGIN)
        self.play(FadeIn(step), run_time=0.4)
        self.play(Write(eq), run_time=1.5)
"#;

const GRAPH_PLOT: &str = r#"        xr = v.get("x_range") or [-5, 5, 1]
        yr = v.get("y_range") or [-5, 5, 1]
        axes = self.create_axes(xr, yr, x_length=8.0, y_length=5.5)
        self.play(Create(axes), run_time=1.5)
        for fn in v.get("functions") or []:
            if not isinstance(fn, dict):
                continue
            expr = str(fn.get("expr", "x"))
            label = str(fn.get("label", ""))
            color = _color(fn.get("color"), BLUE_C)
            try:
                graph = axes.plot(
                    lambda x, _e=expr: eval(_e, {**_SAFE_NS, "x": x}),
                    color=color,
                    x_range=[xr[0], xr[1]],
                    use_smoothing=True,
                )
                self.play(Create(graph), run_time=2.0)
                if label:
                    gl = axes.get_graph_label(graph, label, color=color, font_size=20)
                    self.play(FadeIn(gl), run_time=0.8)
            except Exception:
                pass
"#;

const GRAPH_ANIMATE: &str = r#"        axes = self.create_axes([-4, 4, 1], [-2, 2, 1])
        self.play(Create(axes), run_time=1.5)
        param = str(v.get("parameter", "t"))
        expr = str(v.get("function_expr", "np.sin(x)"))
        rng = v.get("range") or [0, 5]
        try:
            p_start, p_end = float(rng[0]), float(rng[1])
        except (IndexError, TypeError, ValueError):
            p_start, p_end = 0.0, 5.0
        tracker = ValueTracker(p_start)

        def make_graph():
            p_val = tracker.get_value()
            try:
                return axes.plot(
                    lambda x, _p=p_val: eval(expr, {**_SAFE_NS, "x": x, param: _p}),
                    color=BLUE_C,
                    x_range=[-4, 4],
                    use_smoothing=True,
                )
            except Exception:
                return axes.plot(lambda x: 0, color=BLUE_C)

        graph = make_graph()
        graph.add_updater(lambda g: g.become(make_graph()))
        self.add(graph)
        self.play(tracker.animate.set_value(p_end), run_time=max(_DURATION - 2.5, 1.0))
        graph.clear_updaters()
"#;

const VECTOR_SHOW: &str = r#"        plane = self.number_plane()
        self.play(Create(plane), run_time=1.5)
        for vec in v.get("vectors") or []:
            if not isinstance(vec, dict):
                continue
            coords = vec.get("coords") or [1, 0]
            color = _color(vec.get("color"), BLUE)
            label = str(vec.get("label", ""))
            tip = np.array([float(coords[0]), float(coords[1]), 0.0])
            arrow = Arrow(ORIGIN, tip, color=color, buff=0, stroke_width=4)
            self.play(GrowArrow(arrow), run_time=1.5)
            if label:
                lbl = Text(label, color=color, font_size=24)
                lbl.next_to(arrow.get_end(), UP * 0.3, buff=0.15)
                self.play(FadeIn(lbl), run_time=0.6)
"#;

const VECTOR_TRANSFORM: &str = r#"        m = v.get("matrix") or [[1, 0], [0, 1]]
        mat = [[float(m[r][c]) for c in range(2)] for r in range(2)]
        palette = [BLUE, GREEN, RED, YELLOW]
        plane = self.number_plane()
        self.play(Create(plane), run_time=0.7)
        arrows = []
        for i, vec in enumerate(v.get("vectors") or []):
            tip = np.array([float(vec[0]), float(vec[1]), 0.0])
            arrow = Arrow(ORIGIN, tip, color=palette[i % len(palette)], buff=0, stroke_width=4)
            arrows.append(arrow)
            self.play(GrowArrow(arrow), run_time=0.5)
        mat_mob = Matrix(m, element_to_mobject_config={"font_size": 24})
        mat_mob.scale(0.7)
        mat_mob.to_corner(UL)
        self.play(Write(mat_mob), run_time=0.7)
        self.wait(0.3)
        full = np.array([[mat[0][0], mat[0][1], 0], [mat[1][0], mat[1][1], 0], [0, 0, 1]])
        for arrow in arrows:
            self.play(ApplyMatrix(full, arrow), run_time=1.0)
"#;

const MATRIX_DISPLAY: &str = r#"        values = v.get("matrix_values") or [[1, 0], [0, 1]]
        cells = [[str(c)[:12] for c in row] for row in values]
        n_cols = len(cells[0]) if cells and cells[0] else 1
        max_len = max((len(c) for row in cells for c in row), default=1)
        font_size = max(16, min(28, int(200 / (n_cols * max(max_len, 4)))))
        mat = Matrix(
            cells,
            element_to_mobject=Text,
            element_to_mobject_config={"font_size": font_size, "color": WHITE},
            h_buff=max(1.6, 0.18 * max_len),
            v_buff=1.0,
        )
        self.fit(mat)
        mat.move_to(ORIGIN)
        self.play(Write(mat), run_time=1.5)
        entries = mat.get_entries()
        for pair in v.get("highlight_elements") or []:
            try:
                if isinstance(pair, dict):
                    row, col = int(pair["row"]), int(pair["col"])
                else:
                    row, col = int(pair[0]), int(pair[1])
                idx = row * n_cols + col
                if 0 <= idx < len(entries):
                    self.play(entries[idx].animate.set_color(YELLOW), run_time=0.4)
            except (IndexError, KeyError, TypeError, ValueError):
                pass
"#;

const SUMMARY_CARD: &str = r#"        heading = self.safe_text("Summary", font_size=40, color=self.accent, weight=BOLD)
        bullets = [
            self.safe_text(f"• {pt}", font_size=26, color=WHITE)
            for pt in (v.get("key_points") or [])
        ]
        items = VGroup(heading, *bullets)
        items.arrange(DOWN, buff=0.35, aligned_edge=LEFT)
        self.fit(items)
        items.move_to(ORIGIN)
        self.play(FadeIn(heading, shift=RIGHT * 0.2), run_time=0.6)
        for bullet in bullets:
            self.play(FadeIn(bullet, shift=RIGHT * 0.3), run_time=0.4)
"#;

const THEOREM_CARD: &str = r#"        title = self.safe_text(str(v.get("theorem_name", "")), font_size=36, color=self.accent, weight=BOLD)
        statement = self.safe_tex(str(v.get("statement_latex", "")), font_size=32, color=WHITE)
        content = VGroup(title, statement)
        content.arrange(DOWN, buff=0.5)
        box = SurroundingRectangle(content, color=self.accent, buff=0.4, corner_radius=0.1)
        group = VGroup(content, box)
        self.fit(group)
        group.move_to(ORIGIN)
        self.play(Write(title), run_time=1.5)
        self.play(Create(box), Write(statement), run_time=2.5)
"#;

const TEXT_CARD: &str = r#"        t = self.safe_text(str(v.get("text", "")), font_size=32, color=WHITE)
        t.move_to(ORIGIN)
        self.play(FadeIn(t, shift=UP * 0.3), run_time=0.8)
"#;

const PAUSE: &str = "        pass\n";

/// `construct` body for a beat type.
pub(crate) fn body_for(kind: BeatType) -> &'static str {
    match kind {
        BeatType::TitleCard => TITLE_CARD,
        BeatType::EquationReveal => EQUATION_REVEAL,
        BeatType::EquationTransform => EQUATION_TRANSFORM,
        BeatType::Highlight => HIGHLIGHT,
        BeatType::StepReveal => STEP_REVEAL,
        BeatType::GraphPlot => GRAPH_PLOT,
        BeatType::GraphAnimate => GRAPH_ANIMATE,
        BeatType::VectorShow => VECTOR_SHOW,
        BeatType::VectorTransform => VECTOR_TRANSFORM,
        BeatType::MatrixDisplay => MATRIX_DISPLAY,
        BeatType::SummaryCard => SUMMARY_CARD,
        BeatType::TheoremCard => THEOREM_CARD,
        BeatType::TextCard => TEXT_CARD,
        BeatType::Pause => PAUSE,
    }
}
