//! pocket3d: software 3D rendering pipeline
//!
//! Textured triangle meshes go from object space to pixels with no GPU:
//! pluggable position/vertex shader stages, triangle clipping and culling,
//! filled (Gouraud, depth-tested) or wireframe rasterization into a small
//! framebuffer. This binary is a thin viewer around the pipeline.
//!
//! Keys: Space = wireframe, L = lighting on/off, H = hide/show cap mesh,
//! Tab = display mode, Up/Down = dolly, V = print vertex count,
//! S = save the model as RON.
//! Usage: `pocket3d [model.ron [texture.png ...]]` to view your own model.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod pipeline;
mod scene;

use macroquad::prelude::*;
use pipeline::{
    load_model, save_model, Camera, Color as RasterColor, Framebuffer, LitVertexShader, Mat4,
    MvpPositionShader, Render3D, Texture as RasterTexture, UnlitVertexShader, Vec3, Vec4, HEIGHT,
    HEIGHT_HI, MAX_TEXTURE_SLOTS, WIDTH, WIDTH_HI,
};
use scene::Scene;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("pocket3d v{}", VERSION),
        window_width: WIDTH as i32 * 3,
        window_height: HEIGHT as i32 * 3,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let mut fb = Framebuffer::new(WIDTH, HEIGHT);
    let mut r3d = Render3D::new();
    let mut scene = Scene::new();

    r3d.set_projection(Camera::perspective_matrix(
        0.1,
        10.0,
        std::f32::consts::FRAC_PI_4,
        fb.width as f32 / fb.height as f32,
    ));
    r3d.set_position_shader(Box::new(MvpPositionShader));
    r3d.set_vertex_shader(Box::new(LitVertexShader));
    r3d.set_clear_colour(RasterColor::new(20, 30, 40));

    for (slot, texture) in scene::demo_textures() {
        r3d.set_texture(texture, slot);
    }

    // Optional: `pocket3d model.ron [texture.png ...]` replaces the built-in
    // scene; textures fill slots 0 upward
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(path) = args.first() {
        match load_model(path) {
            Ok(model) => {
                println!("Loaded model '{}' ({} meshes)", model.name, model.get_num_meshes());
                scene.model = model;
            }
            Err(e) => {
                eprintln!("Failed to load {}: {}", path, e);
            }
        }
        for (slot, path) in args.iter().skip(1).take(MAX_TEXTURE_SLOTS).enumerate() {
            match RasterTexture::from_file(path) {
                Ok(texture) => {
                    println!("Loaded texture: {} ({}x{})", texture.name, texture.width, texture.height);
                    r3d.set_texture(texture, slot);
                }
                Err(e) => {
                    eprintln!("{}", e);
                }
            }
        }
    }

    println!("=== pocket3d v{} ===", VERSION);

    let mut lit = true;

    loop {
        let dt = get_frame_time();

        if is_key_pressed(KeyCode::Space) {
            scene.wireframe = !scene.wireframe;
        }
        if is_key_pressed(KeyCode::H) {
            scene.toggle_mesh("cap");
        }
        if is_key_pressed(KeyCode::L) {
            lit = !lit;
            if lit {
                r3d.set_vertex_shader(Box::new(LitVertexShader));
            } else {
                r3d.set_vertex_shader(Box::new(UnlitVertexShader));
            }
        }
        if is_key_pressed(KeyCode::Tab) {
            scene.hires = !scene.hires;
            if scene.hires {
                fb.resize(WIDTH_HI, HEIGHT_HI);
            } else {
                fb.resize(WIDTH, HEIGHT);
            }
        }
        if is_key_down(KeyCode::Up) {
            scene.dolly(0.8 * dt);
        }
        if is_key_down(KeyCode::Down) {
            scene.dolly(-0.8 * dt);
        }
        if is_key_pressed(KeyCode::S) {
            match save_model(&scene.model, "model.ron") {
                Ok(()) => println!("Saved model to model.ron"),
                Err(e) => eprintln!("Save failed: {}", e),
            }
        }

        // World-to-view transform, rebuilt from the camera every frame
        let camera_transformation = scene.camera.get_look_matrix();

        // Object transform: place the tower ahead of the camera, spin on y
        let mut object_transformation = Mat4::identity();
        object_transformation *= Mat4::translation(Vec3::new(0.0, 0.0, -3.0));
        object_transformation *= Mat4::rotation(get_time() as f32 * 0.8, Vec3::UP);

        r3d.set_model_view(camera_transformation * object_transformation);

        // Light rides in view space: fixed world direction, rotated by the camera
        let light = Vec3::new(1.0, 0.0, 0.0);
        scene.params.light_direction =
            (camera_transformation * Vec4::from_direction(light)).xyz().normalize();

        for i in 0..scene.model.get_num_meshes() {
            if scene.is_visible(&scene.model.mesh(i).name) {
                scene.model.draw_mesh(i, &mut r3d, &scene.params);
            }
        }

        let vertex_count = r3d.get_transformed_vertex_count();
        if is_key_pressed(KeyCode::V) {
            println!("transformed vertices this frame: {}", vertex_count);
        }

        r3d.set_fill_triangles(!scene.wireframe);
        r3d.rasterise(&mut fb);

        // Blit the software framebuffer, scaled to the window
        let texture = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.pixels);
        texture.set_filter(FilterMode::Nearest);
        draw_texture_ex(
            &texture,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(screen_width(), screen_height())),
                ..Default::default()
            },
        );

        next_frame().await;
    }
}
